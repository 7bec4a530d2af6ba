//! Log-posterior construction.
//!
//! A [`ModelPdf`] turns a [`Curve`], a dataset, an error-axis selection and a
//! list of [`Parameter`]s into a [`LogPdf`]: a closure over the captured data
//! that maps a *free* parameter vector to `log L + log prior`.
//!
//! Per point, with residual `r = y - f(x)` and local slope `f'(x)`:
//!
//! ```text
//! var = yerr² + (f'(x)·xerr)² + σ²        (σ only when scatter is fitted)
//! uncensored:  -0.5·(r²/var + ln(2π·var))
//! y upper:     ln Φ((y_b - f(x))/√var)
//! y lower:     ln Φ((f(x) - y_b)/√var)
//! x upper:     ln Φ(sign(f')·(f(x_b) - y)/√var)
//! x lower:     ln Φ(sign(f')·(y - f(x_b))/√var)
//! ```
//!
//! Error bars not selected by the [`ErrorAxis`] are ignored. When scatter is
//! fitted it is the last free parameter and carries a log-uniform prior
//! (`-ln σ`, `σ > 0`). Evaluation never fails: anything outside the support
//! (violated bounds, `σ <= 0`, NaN model output) reads as `-inf`.

use std::fmt;
use std::sync::{Arc, LazyLock};

use log::debug;

use crate::domain::{CensoredPoint, Censoring, Dataset, ErrorAxis, Parameter, expand_free, free_count};
use crate::error::FitResult;
use crate::math::{log_normal_pdf, log_prob_above, log_prob_below, variance};
use crate::models::{Curve, DataSpace, line, power_law};

/// Unnormalized log-posterior over the free parameter vector.
#[derive(Clone)]
pub struct LogPdf(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>);

impl LogPdf {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate at a free parameter vector. NaN is reported as `-inf`.
    pub fn evaluate(&self, free: &[f64]) -> f64 {
        let v = (self.0)(free);
        if v.is_nan() { f64::NEG_INFINITY } else { v }
    }
}

impl fmt::Debug for LogPdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogPdf(..)")
    }
}

/// Builds log-posteriors for one functional form.
///
/// Censoring modifiers return a new builder with the extra limits appended;
/// the receiver is never modified.
#[derive(Clone, Debug)]
pub struct ModelPdf {
    curve: Curve,
    limits: Vec<CensoredPoint>,
}

pub static LINE_PDF: LazyLock<ModelPdf> = LazyLock::new(ModelPdf::line);
pub static POWER_LAW_PDF: LazyLock<ModelPdf> = LazyLock::new(ModelPdf::power_law);

impl ModelPdf {
    pub fn curve<F>(f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::from_curve(Curve::new(f))
    }

    pub fn from_curve(curve: Curve) -> Self {
        Self {
            curve,
            limits: Vec::new(),
        }
    }

    /// `y = p[0] + p[1]*x`.
    pub fn line() -> Self {
        Self::from_curve(line())
    }

    /// `y = p[0]*x^p[1]`; error bars are base-10 logarithmic.
    pub fn power_law() -> Self {
        Self::from_curve(power_law())
    }

    pub fn model_curve(&self) -> &Curve {
        &self.curve
    }

    pub fn limits(&self) -> &[CensoredPoint] {
        &self.limits
    }

    /// Append limits carrying their own error on the limited axis.
    pub fn with_censored(&self, points: &[CensoredPoint]) -> Self {
        let mut limits = self.limits.clone();
        limits.extend_from_slice(points);
        Self {
            curve: self.curve.clone(),
            limits,
        }
    }

    fn with_limits(&self, direction: Censoring, points: &[(f64, f64)]) -> Self {
        let extra: Vec<CensoredPoint> = points
            .iter()
            .map(|&(x, y)| CensoredPoint::new(x, y, direction))
            .collect();
        self.with_censored(&extra)
    }

    /// Points whose true `y` lies at or below the recorded value.
    pub fn y_upper_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_limits(Censoring::YUpper, points)
    }

    pub fn y_lower_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_limits(Censoring::YLower, points)
    }

    /// Points whose true `x` lies at or below the recorded value.
    pub fn x_upper_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_limits(Censoring::XUpper, points)
    }

    pub fn x_lower_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_limits(Censoring::XLower, points)
    }

    /// General entry point behind the named methods.
    ///
    /// `ErrorAxis::None` always fits scatter, since no other variance exists.
    pub fn log_pdf(
        &self,
        p0: &[Parameter],
        data: &Dataset,
        axis: ErrorAxis,
        scatter: bool,
    ) -> LogPdf {
        let likelihood = Likelihood {
            curve: self.curve.clone(),
            params: p0.to_vec(),
            points: self.prepare_points(data, axis),
            scatter: scatter || axis == ErrorAxis::None,
        };
        LogPdf::new(move |free| likelihood.log_posterior(free))
    }

    /// Gaussian scatter as the only variance; adds one free parameter.
    pub fn unknown_errors(&self, p0: &[Parameter], x: &[f64], y: &[f64]) -> LogPdf {
        let data = Dataset::new(x, y);
        self.log_pdf_or_impossible(p0, data, ErrorAxis::None, true)
    }

    pub fn y_errors(&self, p0: &[Parameter], x: &[f64], y: &[f64], yerr: &[f64]) -> LogPdf {
        let data = Dataset::new(x, y).and_then(|d| d.with_yerr(yerr));
        self.log_pdf_or_impossible(p0, data, ErrorAxis::Y, false)
    }

    pub fn x_errors(&self, p0: &[Parameter], x: &[f64], y: &[f64], xerr: &[f64]) -> LogPdf {
        let data = Dataset::new(x, y).and_then(|d| d.with_xerr(xerr));
        self.log_pdf_or_impossible(p0, data, ErrorAxis::X, false)
    }

    pub fn xy_errors(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        xerr: &[f64],
        yerr: &[f64],
    ) -> LogPdf {
        let data = Dataset::new(x, y).and_then(|d| d.with_xerr(xerr)?.with_yerr(yerr));
        self.log_pdf_or_impossible(p0, data, ErrorAxis::Xy, false)
    }

    /// Like [`ModelPdf::y_errors`] with an extra scatter parameter.
    pub fn y_errors_and_scatter(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        yerr: &[f64],
    ) -> LogPdf {
        let data = Dataset::new(x, y).and_then(|d| d.with_yerr(yerr));
        self.log_pdf_or_impossible(p0, data, ErrorAxis::Y, true)
    }

    pub fn x_errors_and_scatter(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        xerr: &[f64],
    ) -> LogPdf {
        let data = Dataset::new(x, y).and_then(|d| d.with_xerr(xerr));
        self.log_pdf_or_impossible(p0, data, ErrorAxis::X, true)
    }

    pub fn xy_errors_and_scatter(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        xerr: &[f64],
        yerr: &[f64],
    ) -> LogPdf {
        let data = Dataset::new(x, y).and_then(|d| d.with_xerr(xerr)?.with_yerr(yerr));
        self.log_pdf_or_impossible(p0, data, ErrorAxis::Xy, true)
    }

    /// Malformed slices (length mismatch, non-finite values, non-positive
    /// error bars) give a log-posterior that is `-inf` everywhere.
    fn log_pdf_or_impossible(
        &self,
        p0: &[Parameter],
        data: FitResult<Dataset>,
        axis: ErrorAxis,
        scatter: bool,
    ) -> LogPdf {
        match data {
            Ok(data) => self.log_pdf(p0, &data, axis, scatter),
            Err(e) => {
                debug!("log-posterior has no support: {e}");
                LogPdf::new(|_| f64::NEG_INFINITY)
            }
        }
    }

    /// Starting value for the scatter parameter: the RMS residual of the
    /// uncensored points at the initial guess, falling back to the standard
    /// deviation of `y` and then to 1.
    pub(crate) fn scatter_guess(&self, p0: &[Parameter], data: &Dataset) -> f64 {
        let space = self.curve.space();
        let full: Vec<f64> = p0.iter().map(Parameter::value).collect();
        let mut residuals = Vec::with_capacity(data.len());
        let mut ys = Vec::with_capacity(data.len());
        for i in 0..data.len() {
            if data.censoring(i).is_censored() {
                continue;
            }
            let y = to_space(space, data.y()[i]);
            residuals.push(y - self.curve.predict(to_space(space, data.x()[i]), &full));
            ys.push(y);
        }

        let rms = if residuals.is_empty() {
            f64::NAN
        } else {
            (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
        };
        [rms, variance(&ys).sqrt(), 1.0]
            .into_iter()
            .find(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(1.0)
    }

    fn prepare_points(&self, data: &Dataset, axis: ErrorAxis) -> Vec<Point> {
        let space = self.curve.space();
        let mut points = Vec::with_capacity(data.len() + self.limits.len());
        for i in 0..data.len() {
            let xerr = match data.xerr() {
                Some(e) if axis.uses_x() => e[i],
                _ => 0.0,
            };
            let yerr = match data.yerr() {
                Some(e) if axis.uses_y() => e[i],
                _ => 0.0,
            };
            points.push(Point {
                x: to_space(space, data.x()[i]),
                y: to_space(space, data.y()[i]),
                xerr,
                yerr,
                sign: data.y()[i].signum(),
                tag: data.censoring(i),
            });
        }
        for limit in &self.limits {
            let (xerr, yerr) = if limit.direction.on_x() {
                (limit.err, 0.0)
            } else {
                (0.0, limit.err)
            };
            points.push(Point {
                x: to_space(space, limit.x),
                y: to_space(space, limit.y),
                xerr,
                yerr,
                sign: limit.y.signum(),
                tag: limit.direction,
            });
        }
        points
    }
}

fn to_space(space: DataSpace, v: f64) -> f64 {
    match space {
        DataSpace::Linear => v,
        DataSpace::Log10 => v.abs().log10(),
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
    xerr: f64,
    yerr: f64,
    /// Sign of the recorded `y` before any change of space.
    sign: f64,
    tag: Censoring,
}

struct Likelihood {
    curve: Curve,
    params: Vec<Parameter>,
    points: Vec<Point>,
    scatter: bool,
}

impl Likelihood {
    fn log_posterior(&self, free: &[f64]) -> f64 {
        let n_model = free_count(&self.params);
        if free.len() != n_model + usize::from(self.scatter) {
            return f64::NEG_INFINITY;
        }
        let (model_free, rest) = free.split_at(n_model);

        let mut lp = 0.0;
        for (param, &v) in self.params.iter().filter(|p| !p.is_frozen()).zip(model_free) {
            lp += param.log_prior_at(v);
        }
        if !(lp > f64::NEG_INFINITY) {
            return f64::NEG_INFINITY;
        }

        let scatter_sq = if self.scatter {
            let s = rest[0];
            if !(s > 0.0 && s.is_finite()) {
                return f64::NEG_INFINITY;
            }
            lp -= s.ln();
            s * s
        } else {
            0.0
        };

        let full = expand_free(&self.params, model_free);
        for point in &self.points {
            lp += self.point_term(point, &full, scatter_sq);
            // Also catches NaN.
            if !(lp > f64::NEG_INFINITY) {
                return f64::NEG_INFINITY;
            }
        }
        lp
    }

    fn point_term(&self, pt: &Point, full: &[f64], scatter_sq: f64) -> f64 {
        if self.curve.sign(pt.x, full).is_some_and(|s| s != pt.sign) {
            return f64::NEG_INFINITY;
        }
        let mu = self.curve.predict(pt.x, full);
        let slope = if pt.xerr > 0.0 || pt.tag.on_x() {
            self.curve.slope(pt.x, full)
        } else {
            0.0
        };
        let sx = slope * pt.xerr;
        let var = pt.yerr * pt.yerr + sx * sx + scatter_sq;
        let sigma = var.sqrt();

        match pt.tag {
            Censoring::None => {
                if var > 0.0 {
                    log_normal_pdf(pt.y - mu, var)
                } else {
                    f64::NEG_INFINITY
                }
            }
            Censoring::YUpper => log_prob_below(pt.y, mu, sigma),
            Censoring::YLower => log_prob_above(pt.y, mu, sigma),
            // Along x through the local slope: for a rising curve, "true x at
            // or below x_b" means the curve at x_b sits above the point.
            Censoring::XUpper => {
                if slope.signum() > 0.0 {
                    log_prob_above(pt.y, mu, sigma)
                } else {
                    log_prob_below(pt.y, mu, sigma)
                }
            }
            Censoring::XLower => {
                if slope.signum() > 0.0 {
                    log_prob_below(pt.y, mu, sigma)
                } else {
                    log_prob_above(pt.y, mu, sigma)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    use nalgebra::{DMatrix, DVector};

    const X: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
    const Y: [f64; 5] = [2.1, 3.9, 6.2, 7.8, 10.1];

    fn p0() -> Vec<Parameter> {
        vec![Parameter::new(0.0, 0.1), Parameter::new(2.0, 0.1)]
    }

    fn ssr(p: &[f64]) -> f64 {
        X.iter()
            .zip(Y.iter())
            .map(|(x, y)| {
                let r = y - (p[0] + p[1] * x);
                r * r
            })
            .sum()
    }

    #[test]
    fn unit_y_errors_reduce_to_sum_of_squares() {
        let pdf = ModelPdf::line().y_errors(&p0(), &X, &Y, &[1.0; 5]);
        let norm = -0.5 * X.len() as f64 * (2.0 * PI).ln();
        for p in [[0.0, 2.0], [1.0, 1.5], [-3.0, 4.0]] {
            let expected = -0.5 * ssr(&p) + norm;
            assert!((pdf.evaluate(&p) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn unit_y_errors_peak_at_least_squares_solution() {
        // Solve the normal equations through SVD, as a direct OLS reference.
        let design = DMatrix::from_fn(X.len(), 2, |i, j| if j == 0 { 1.0 } else { X[i] });
        let obs = DVector::from_row_slice(&Y);
        let beta = design.svd(true, true).solve(&obs, 1e-12).unwrap();
        let best = [beta[0], beta[1]];

        let pdf = ModelPdf::line().y_errors(&p0(), &X, &Y, &[1.0; 5]);
        let at_best = pdf.evaluate(&best);
        for d in [[1e-3, 0.0], [0.0, 1e-3], [-1e-3, 1e-3]] {
            let nearby = [best[0] + d[0], best[1] + d[1]];
            assert!(pdf.evaluate(&nearby) < at_best);
        }
    }

    #[test]
    fn frozen_parameters_are_substituted() {
        let params = vec![Parameter::new(0.5, 0.1).freeze(), Parameter::new(2.0, 0.1)];
        let pdf = ModelPdf::line().y_errors(&params, &X, &Y, &[1.0; 5]);
        let full = ModelPdf::line().y_errors(&p0(), &X, &Y, &[1.0; 5]);
        assert_eq!(pdf.evaluate(&[2.0]), full.evaluate(&[0.5, 2.0]));
        // Wrong arity is outside the support, not a panic.
        assert_eq!(pdf.evaluate(&[0.5, 2.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn bounds_and_priors_enter_the_posterior() {
        let params = vec![
            Parameter::new(0.0, 0.1),
            Parameter::new(2.0, 0.1).limits(0.0, 3.0).log_prior(|s| -s),
        ];
        let bounded = ModelPdf::line().y_errors(&params, &X, &Y, &[1.0; 5]);
        let plain = ModelPdf::line().y_errors(&p0(), &X, &Y, &[1.0; 5]);
        assert_eq!(bounded.evaluate(&[0.0, 3.5]), f64::NEG_INFINITY);
        let diff = bounded.evaluate(&[0.0, 2.0]) - plain.evaluate(&[0.0, 2.0]);
        assert!((diff + 2.0).abs() < 1e-12);
    }

    #[test]
    fn scatter_must_be_positive_and_is_log_uniform() {
        let pdf = ModelPdf::line().unknown_errors(&p0(), &X, &Y);
        assert_eq!(pdf.evaluate(&[0.0, 2.0, -1.0]), f64::NEG_INFINITY);
        assert_eq!(pdf.evaluate(&[0.0, 2.0, 0.0]), f64::NEG_INFINITY);

        let s: f64 = 0.7;
        let expected: f64 = X
            .iter()
            .zip(Y.iter())
            .map(|(x, y)| log_normal_pdf(y - 2.0 * x, s * s))
            .sum::<f64>()
            - s.ln();
        assert!((pdf.evaluate(&[0.0, 2.0, s]) - expected).abs() < 1e-9);
    }

    #[test]
    fn scatter_adds_in_quadrature_to_y_errors() {
        let pdf = ModelPdf::line().y_errors_and_scatter(&p0(), &X, &Y, &[0.3; 5]);
        let s: f64 = 0.4;
        let expected: f64 = X
            .iter()
            .zip(Y.iter())
            .map(|(x, y)| log_normal_pdf(y - 2.0 * x, 0.09 + 0.16))
            .sum::<f64>()
            - s.ln();
        assert!((pdf.evaluate(&[0.0, 2.0, s]) - expected).abs() < 1e-9);
    }

    #[test]
    fn x_errors_propagate_through_the_slope() {
        let xerr = [0.5; 5];
        let pdf = ModelPdf::line().x_errors(&p0(), &X, &Y, &xerr);
        // slope 2, xerr 0.5 -> effective sigma 1
        let expected = -0.5 * ssr(&[0.0, 2.0]) - 0.5 * X.len() as f64 * (2.0 * PI).ln();
        assert!((pdf.evaluate(&[0.0, 2.0]) - expected).abs() < 1e-9);
        // A flat model has no x-propagated variance at all.
        assert_eq!(pdf.evaluate(&[5.0, 0.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn xy_errors_combine_both_axes() {
        let xy = ModelPdf::line().xy_errors(&p0(), &X, &Y, &[0.3; 5], &[0.8; 5]);
        // (2*0.3)^2 + 0.8^2 = 1
        let expected = -0.5 * ssr(&[0.0, 2.0]) - 0.5 * X.len() as f64 * (2.0 * PI).ln();
        assert!((xy.evaluate(&[0.0, 2.0]) - expected).abs() < 1e-9);
    }

    #[test]
    fn numeric_slope_matches_analytic_line() {
        let numeric = ModelPdf::curve(|x, p| p[0] + p[1] * x).x_errors(&p0(), &X, &Y, &[0.4; 5]);
        let analytic = ModelPdf::line().x_errors(&p0(), &X, &Y, &[0.4; 5]);
        let a = numeric.evaluate(&[0.2, 1.9]);
        let b = analytic.evaluate(&[0.2, 1.9]);
        assert!((a - b).abs() < 1e-6, "{a} vs {b}");
    }

    #[test]
    fn y_upper_limit_penalizes_curves_above_the_bound() {
        let base = ModelPdf::line();
        let limited = base.with_censored(&[CensoredPoint::new(6.0, 11.0, Censoring::YUpper).with_error(0.2)]);
        let yerr = [0.2; 5];
        let plain = base.y_errors(&p0(), &X, &Y, &yerr);
        let with_limit = limited.y_errors(&p0(), &X, &Y, &yerr);

        // y(6) = 8 sits well below the bound; y(6) = 14 sits above it.
        let low = [2.0, 1.0];
        let high = [2.0, 2.0];
        let penalty_low = with_limit.evaluate(&low) - plain.evaluate(&low);
        let penalty_high = with_limit.evaluate(&high) - plain.evaluate(&high);
        assert!(penalty_low.abs() < 1e-9, "{penalty_low}");
        assert!(penalty_high < -10.0, "{penalty_high}");

        // Without an error on the bound the tail is a hard step.
        let hard = base.y_upper_limits(&[(6.0, 11.0)]).y_errors(&p0(), &X, &Y, &yerr);
        assert_eq!(hard.evaluate(&high), f64::NEG_INFINITY);
        assert_eq!(hard.evaluate(&low), plain.evaluate(&low));
    }

    #[test]
    fn limit_modifiers_accumulate_and_leave_the_receiver_alone() {
        let base = ModelPdf::line();
        let one = base.y_upper_limits(&[(6.0, 11.0)]);
        let two = one.y_upper_limits(&[(7.0, 12.0)]).x_lower_limits(&[(0.0, 1.0)]);
        assert!(base.limits().is_empty());
        assert_eq!(one.limits().len(), 1);
        assert_eq!(two.limits().len(), 3);
        assert_eq!(two.limits()[2].direction, Censoring::XLower);
    }

    #[test]
    fn y_lower_limit_penalizes_curves_below_the_bound() {
        let pdf = ModelPdf::line()
            .with_censored(&[CensoredPoint::new(6.0, 11.0, Censoring::YLower).with_error(0.5)])
            .y_errors(&p0(), &X, &Y, &[0.2; 5]);
        let plain = ModelPdf::line().y_errors(&p0(), &X, &Y, &[0.2; 5]);
        let below = [2.0, 1.0];
        let above = [2.0, 2.0];
        assert!(pdf.evaluate(&below) - plain.evaluate(&below) < -10.0);
        assert!((pdf.evaluate(&above) - plain.evaluate(&above)).abs() < 1e-6);
    }

    #[test]
    fn x_limits_follow_the_sign_of_the_slope() {
        // True x of the point (x_b = 6, y = 20) is at most 6.
        let limit = [CensoredPoint::new(6.0, 20.0, Censoring::XUpper).with_error(0.1)];
        let pdf = ModelPdf::line().with_censored(&limit).y_errors(&p0(), &X, &Y, &[0.2; 5]);
        let plain = ModelPdf::line().y_errors(&p0(), &X, &Y, &[0.2; 5]);
        // Rising curve reaching 20 before x = 6 (y(6) = 24): consistent.
        let steep = [0.0, 4.0];
        // Rising curve reaching 20 only after x = 6 (y(6) = 12): inconsistent.
        let shallow = [0.0, 2.0];
        let ok = pdf.evaluate(&steep) - plain.evaluate(&steep);
        let bad = pdf.evaluate(&shallow) - plain.evaluate(&shallow);
        assert!(ok.abs() < 1e-6, "{ok}");
        assert!(bad < -10.0, "{bad}");
    }

    /// Log-posterior change from adding `limit`, at `p`.
    fn limit_penalty(limit: CensoredPoint, p: [f64; 2]) -> f64 {
        let plain = ModelPdf::line().y_errors(&p0(), &X, &Y, &[0.2; 5]);
        let limited = ModelPdf::line().with_censored(&[limit]).y_errors(&p0(), &X, &Y, &[0.2; 5]);
        limited.evaluate(&p) - plain.evaluate(&p)
    }

    #[test]
    fn x_lower_limit_on_a_rising_curve() {
        // True x of the point (x_b = 6, y = 20) is at least 6.
        let limit = CensoredPoint::new(6.0, 20.0, Censoring::XLower).with_error(0.1);
        // y(6) = 12: the curve reaches 20 only after x = 6.
        let shallow = limit_penalty(limit, [0.0, 2.0]);
        // y(6) = 24: the curve passed 20 before x = 6.
        let steep = limit_penalty(limit, [0.0, 4.0]);
        assert!(shallow.abs() < 1e-6, "{shallow}");
        assert!(steep < -10.0, "{steep}");
    }

    #[test]
    fn x_limits_flip_on_a_falling_curve() {
        // A falling curve reaches y = -20 at x = 20 / |slope|.
        let upper = CensoredPoint::new(6.0, -20.0, Censoring::XUpper).with_error(0.1);
        let lower = CensoredPoint::new(6.0, -20.0, Censoring::XLower).with_error(0.1);
        // Crosses -20 at x = 5.
        let steep = [0.0, -4.0];
        // Crosses -20 at x = 10.
        let shallow = [0.0, -2.0];

        assert!(limit_penalty(upper, steep).abs() < 1e-6);
        assert!(limit_penalty(upper, shallow) < -10.0);
        assert!(limit_penalty(lower, shallow).abs() < 1e-6);
        assert!(limit_penalty(lower, steep) < -10.0);
    }

    #[test]
    fn censored_dataset_points_use_their_own_errors() {
        let data = Dataset::new(&[1.0, 2.0], &[2.0, 4.0])
            .unwrap()
            .with_yerr(&[0.5, 0.5])
            .unwrap()
            .with_censoring(&[Censoring::None, Censoring::YUpper])
            .unwrap();
        let pdf = ModelPdf::line().log_pdf(&p0(), &data, ErrorAxis::Y, false);
        let p = [0.0, 2.5];
        let expected = log_normal_pdf(2.0 - 2.5, 0.25) + log_prob_below(4.0, 5.0, 0.5);
        assert!((pdf.evaluate(&p) - expected).abs() < 1e-12);
    }

    #[test]
    fn power_law_fits_in_log_space() {
        let x = [1.0, 10.0, 100.0];
        let y = [3.0, 300.0, 30000.0];
        let pdf = ModelPdf::power_law().y_errors(&p0(), &x, &y, &[0.1; 3]);
        let exact = pdf.evaluate(&[3.0, 2.0]);
        let off = pdf.evaluate(&[3.0, 2.2]);
        let expected = 3.0 * log_normal_pdf(0.0, 0.01);
        assert!((exact - expected).abs() < 1e-9);
        assert!(off < exact);
    }

    #[test]
    fn power_law_amplitude_must_match_the_sign_of_the_data() {
        let x = [1.0, 10.0, 100.0];
        let pdf = ModelPdf::power_law().y_errors(&p0(), &x, &[3.0, 300.0, 30000.0], &[0.1; 3]);
        assert!(pdf.evaluate(&[3.0, 2.0]).is_finite());
        assert_eq!(pdf.evaluate(&[-3.0, 2.0]), f64::NEG_INFINITY);

        let negative = ModelPdf::power_law().y_errors(&p0(), &x, &[-3.0, -300.0, -30000.0], &[0.1; 3]);
        assert!(negative.evaluate(&[-3.0, 2.0]).is_finite());
        assert_eq!(negative.evaluate(&[3.0, 2.0]), f64::NEG_INFINITY);
        assert_eq!(negative.evaluate(&[-3.0, 2.0]), pdf.evaluate(&[3.0, 2.0]));
    }

    #[test]
    fn nan_model_output_reads_as_impossible() {
        let pdf = ModelPdf::curve(|x, p| (p[0] * x).ln()).y_errors(
            &[Parameter::new(1.0, 0.1)],
            &[1.0, 2.0],
            &[0.0, 0.7],
            &[0.1, 0.1],
        );
        assert_eq!(pdf.evaluate(&[-1.0]), f64::NEG_INFINITY);
        assert!(pdf.evaluate(&[1.0]).is_finite());
    }

    #[test]
    fn scatter_guess_prefers_residual_rms() {
        let data = Dataset::new(&X, &Y).unwrap();
        let guess = ModelPdf::line().scatter_guess(&p0(), &data);
        let rms = (ssr(&[0.0, 2.0]) / 5.0).sqrt();
        assert!((guess - rms).abs() < 1e-12);

        // A perfect initial guess falls back to the spread of y.
        let exact = Dataset::new(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((ModelPdf::line().scatter_guess(&p0(), &exact) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn malformed_slices_give_an_empty_support() {
        let short = LINE_PDF.y_errors(&p0(), &X, &Y[..4], &[0.2; 5]);
        assert_eq!(short.evaluate(&[0.0, 2.0]), f64::NEG_INFINITY);
        let bad_err = LINE_PDF.xy_errors(&p0(), &X, &Y, &[0.1; 5], &[0.2, 0.2, -1.0, 0.2, 0.2]);
        assert_eq!(bad_err.evaluate(&[0.0, 2.0]), f64::NEG_INFINITY);
        let nan = LINE_PDF.unknown_errors(&p0(), &[1.0, f64::NAN], &[1.0, 2.0]);
        assert_eq!(nan.evaluate(&[0.0, 2.0, 1.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn shared_builders_are_usable_from_statics() {
        let pdf = LINE_PDF.y_errors(&p0(), &X, &Y, &[1.0; 5]);
        assert!(pdf.evaluate(&[0.0, 2.0]).is_finite());
        assert!(POWER_LAW_PDF.limits().is_empty());
    }
}
