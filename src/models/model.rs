//! Model function evaluation.
//!
//! The posterior builder relies on two primitive operations:
//! - predict `y(x)` given the full parameter vector
//! - the local slope `dy/dx`, used to propagate x error bars
//!
//! A [`Curve`] bundles both. Curves built from a bare closure fall back to a
//! central finite difference for the slope.

use std::fmt;
use std::sync::Arc;

/// Scalar model function: `(x, full parameter vector) -> y`.
pub type ModelFn = Arc<dyn Fn(f64, &[f64]) -> f64 + Send + Sync>;

/// Relative step used for finite-difference slopes.
const SLOPE_REL_STEP: f64 = 1e-6;

/// Which space the data live in before the model sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSpace {
    /// Data are passed through unchanged.
    Linear,
    /// `x`, `y` and limit bounds are mapped to `log10(|v|)`; error bars are
    /// taken to already be base-10 logarithmic. The magnitude loses the sign
    /// of `y`, so such curves should also report it through
    /// [`Curve::with_sign`].
    Log10,
}

/// A parametric 1D model.
#[derive(Clone)]
pub struct Curve {
    f: ModelFn,
    slope: Option<ModelFn>,
    sign: Option<ModelFn>,
    space: DataSpace,
}

impl Curve {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(f),
            slope: None,
            sign: None,
            space: DataSpace::Linear,
        }
    }

    /// Attach an analytic `dy/dx`.
    pub fn with_slope<F>(self, slope: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            slope: Some(Arc::new(slope)),
            ..self
        }
    }

    /// Attach the sign of the modelled `y` (`+1` or `-1`). Data whose sign
    /// disagrees make the parameters impossible.
    pub fn with_sign<F>(self, sign: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            sign: Some(Arc::new(sign)),
            ..self
        }
    }

    pub(crate) fn in_space(self, space: DataSpace) -> Self {
        Self { space, ..self }
    }

    pub fn space(&self) -> DataSpace {
        self.space
    }

    pub fn predict(&self, x: f64, params: &[f64]) -> f64 {
        (self.f)(x, params)
    }

    /// Sign of the modelled `y` at `x`, when the curve declares one.
    pub fn sign(&self, x: f64, params: &[f64]) -> Option<f64> {
        self.sign.as_ref().map(|sign| sign(x, params))
    }

    /// Local slope `dy/dx` at `x`.
    pub fn slope(&self, x: f64, params: &[f64]) -> f64 {
        if let Some(slope) = &self.slope {
            return slope(x, params);
        }
        let h = SLOPE_REL_STEP * x.abs().max(1.0);
        (self.predict(x + h, params) - self.predict(x - h, params)) / (2.0 * h)
    }
}

impl fmt::Debug for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Curve")
            .field("analytic_slope", &self.slope.is_some())
            .field("signed", &self.sign.is_some())
            .field("space", &self.space)
            .finish()
    }
}

/// Straight line `y = p[0] + p[1]*x`.
pub fn line() -> Curve {
    Curve::new(|x, p| p[0] + p[1] * x).with_slope(|_, p| p[1])
}

/// Power law `y = p[0]*x^p[1]`, fitted as a line in log10 space:
/// `log10 |y| = log10|p[0]| + p[1]*log10 x`, with `sign(y) = sign(p[0])`.
pub fn power_law() -> Curve {
    Curve::new(|lx, p| p[0].abs().log10() + p[1] * lx)
        .with_slope(|_, p| p[1])
        .with_sign(|_, p| p[0].signum())
        .in_space(DataSpace::Log10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_predicts_and_has_constant_slope() {
        let c = line();
        assert_eq!(c.predict(2.0, &[1.0, 3.0]), 7.0);
        assert_eq!(c.slope(-4.0, &[1.0, 3.0]), 3.0);
    }

    #[test]
    fn finite_difference_slope_matches_derivative() {
        let c = Curve::new(|x, p| p[0] * x * x);
        let s = c.slope(3.0, &[2.0]);
        assert!((s - 12.0).abs() < 1e-5, "slope {s}");
    }

    #[test]
    fn power_law_is_linear_in_log_space() {
        let c = power_law();
        assert_eq!(c.space(), DataSpace::Log10);
        // y = 100 * x^2 at x = 10 -> log10 y = 4
        let lx = 10f64.log10();
        assert!((c.predict(lx, &[100.0, 2.0]) - 4.0).abs() < 1e-12);
        assert_eq!(c.sign(lx, &[100.0, 2.0]), Some(1.0));
        assert_eq!(c.sign(lx, &[-100.0, 2.0]), Some(-1.0));
        assert_eq!(line().sign(1.0, &[1.0, 1.0]), None);
    }
}
