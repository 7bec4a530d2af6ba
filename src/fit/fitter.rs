//! Fitting routines for a single functional form.
//!
//! Given:
//! - initial parameter guesses `p0`
//! - observations `x_i`, `y_i` with optional error bars
//! - any limits attached to the model
//!
//! a [`Model`] builds the log-posterior, seeds an ensemble sampler at
//! `value ± spread`, samples until the convergence tests pass, and reduces
//! the chain to an [`Output`].
//!
//! The named methods (`y_errors`, `xy_errors_and_scatter`, ...) are thin
//! dispatch over one `(ErrorAxis, scatter)` pair; [`Model::fit`] is the
//! general entry point.

use std::sync::LazyLock;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::{CensoredPoint, Dataset, ErrorAxis, Output, Parameter};
use crate::error::{FitError, FitResult};
use crate::fit::convergence::ConvergenceTest;
use crate::fit::posterior::ModelPdf;
use crate::fit::sampler::{Sampler, SamplerConfig};
use crate::fit::summary::{DEFAULT_BURN_IN, summarize};
use crate::models::{Curve, DataSpace};

/// Relative spread of the initial scatter walkers.
const SCATTER_REL_SPREAD: f64 = 0.1;

/// Options that affect how a model is fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub sampler: SamplerConfig,
    /// Tests ANDed by `samples`; empty means [`ConvergenceTest::default`].
    pub tests: Vec<ConvergenceTest>,
    /// Fraction of the chain discarded before summarizing.
    pub burn_in: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            tests: Vec::new(),
            burn_in: DEFAULT_BURN_IN,
        }
    }
}

/// Fits one functional form to data.
#[derive(Debug, Clone)]
pub struct Model {
    pdf: ModelPdf,
    options: ModelOptions,
}

pub static LINE: LazyLock<Model> = LazyLock::new(Model::line);
pub static POWER_LAW: LazyLock<Model> = LazyLock::new(Model::power_law);

impl Model {
    pub fn curve<F>(f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::from_curve(Curve::new(f))
    }

    pub fn from_curve(curve: Curve) -> Self {
        Self {
            pdf: ModelPdf::from_curve(curve),
            options: ModelOptions::default(),
        }
    }

    /// `y = p[0] + p[1]*x`.
    pub fn line() -> Self {
        Self {
            pdf: ModelPdf::line(),
            options: ModelOptions::default(),
        }
    }

    /// `y = p[0]*x^p[1]`. Error bars are base-10 logarithmic; all x values
    /// must share a sign and be non-zero, and likewise for y.
    pub fn power_law() -> Self {
        Self {
            pdf: ModelPdf::power_law(),
            options: ModelOptions::default(),
        }
    }

    pub fn with_options(&self, options: ModelOptions) -> Self {
        Self {
            pdf: self.pdf.clone(),
            options,
        }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// The log-posterior builder behind this model.
    pub fn pdf(&self) -> &ModelPdf {
        &self.pdf
    }

    fn with_pdf(&self, pdf: ModelPdf) -> Self {
        Self {
            pdf,
            options: self.options.clone(),
        }
    }

    pub fn with_censored(&self, points: &[CensoredPoint]) -> Self {
        self.with_pdf(self.pdf.with_censored(points))
    }

    pub fn y_upper_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_pdf(self.pdf.y_upper_limits(points))
    }

    pub fn y_lower_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_pdf(self.pdf.y_lower_limits(points))
    }

    pub fn x_upper_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_pdf(self.pdf.x_upper_limits(points))
    }

    pub fn x_lower_limits(&self, points: &[(f64, f64)]) -> Self {
        self.with_pdf(self.pdf.x_lower_limits(points))
    }

    /// Fit with intrinsic scatter as the only variance. The scatter is
    /// returned as an extra trailing parameter.
    pub fn unknown_errors(&self, p0: &[Parameter], x: &[f64], y: &[f64]) -> FitResult<Output> {
        let data = Dataset::new(x, y)?;
        self.fit(p0, &data, ErrorAxis::None, true)
    }

    pub fn y_errors(&self, p0: &[Parameter], x: &[f64], y: &[f64], yerr: &[f64]) -> FitResult<Output> {
        let data = Dataset::new(x, y)?.with_yerr(yerr)?;
        self.fit(p0, &data, ErrorAxis::Y, false)
    }

    pub fn x_errors(&self, p0: &[Parameter], x: &[f64], y: &[f64], xerr: &[f64]) -> FitResult<Output> {
        let data = Dataset::new(x, y)?.with_xerr(xerr)?;
        self.fit(p0, &data, ErrorAxis::X, false)
    }

    pub fn xy_errors(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        xerr: &[f64],
        yerr: &[f64],
    ) -> FitResult<Output> {
        let data = Dataset::new(x, y)?.with_xerr(xerr)?.with_yerr(yerr)?;
        self.fit(p0, &data, ErrorAxis::Xy, false)
    }

    /// Like [`Model::y_errors`], plus a trailing intrinsic-scatter parameter.
    pub fn y_errors_and_scatter(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        yerr: &[f64],
    ) -> FitResult<Output> {
        let data = Dataset::new(x, y)?.with_yerr(yerr)?;
        self.fit(p0, &data, ErrorAxis::Y, true)
    }

    pub fn x_errors_and_scatter(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        xerr: &[f64],
    ) -> FitResult<Output> {
        let data = Dataset::new(x, y)?.with_xerr(xerr)?;
        self.fit(p0, &data, ErrorAxis::X, true)
    }

    pub fn xy_errors_and_scatter(
        &self,
        p0: &[Parameter],
        x: &[f64],
        y: &[f64],
        xerr: &[f64],
        yerr: &[f64],
    ) -> FitResult<Output> {
        let data = Dataset::new(x, y)?.with_xerr(xerr)?.with_yerr(yerr)?;
        self.fit(p0, &data, ErrorAxis::Xy, true)
    }

    /// Fit an already validated dataset.
    ///
    /// `ErrorAxis::None` always fits scatter. When scatter is fitted the
    /// output has `p0.len() + 1` entries, scatter last.
    pub fn fit(
        &self,
        p0: &[Parameter],
        data: &Dataset,
        axis: ErrorAxis,
        scatter: bool,
    ) -> FitResult<Output> {
        for p in p0 {
            p.validate()?;
        }
        data.require_errors(axis)?;
        if self.pdf.model_curve().space() == DataSpace::Log10 {
            check_log_space(data, self.pdf.limits())?;
        }
        let scatter = scatter || axis == ErrorAxis::None;

        let mut params = p0.to_vec();
        if scatter {
            let s0 = self.pdf.scatter_guess(p0, data);
            params.push(Parameter::new(s0, SCATTER_REL_SPREAD * s0));
        }

        debug!(
            "fitting {} points (+{} limits), axis={axis:?}, scatter={scatter}, params={}",
            data.len(),
            self.pdf.limits().len(),
            params.len()
        );

        let log_pdf = self.pdf.log_pdf(p0, data, axis, scatter);
        let mut sampler = Sampler::new(log_pdf, &params, self.options.sampler.clone())?;
        let chain = sampler.samples(&self.options.tests)?;
        summarize(&chain, &params, self.options.burn_in)
    }
}

/// Log-space fits need non-zero values of one sign per axis.
fn check_log_space(data: &Dataset, limits: &[CensoredPoint]) -> FitResult<()> {
    let xs = data.x().iter().copied().chain(limits.iter().map(|l| l.x));
    let ys = data.y().iter().copied().chain(limits.iter().map(|l| l.y));
    check_one_sign("x", xs)?;
    check_one_sign("y", ys)
}

fn check_one_sign(name: &str, values: impl Iterator<Item = f64>) -> FitResult<()> {
    let mut sign = None;
    for v in values {
        if v == 0.0 {
            return Err(FitError::invalid_data(format!(
                "power-law {name} values must be non-zero"
            )));
        }
        let s = v > 0.0;
        match sign {
            None => sign = Some(s),
            Some(prev) if prev != s => {
                return Err(FitError::invalid_data(format!(
                    "power-law {name} values must all share one sign"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
