//! Fit parameter descriptions.
//!
//! A [`Parameter`] is an immutable value: every modifier returns a new
//! parameter and leaves the receiver untouched, so a base guess can be
//! reused across fits with different priors or frozen sets.

use std::fmt;
use std::sync::Arc;

use crate::error::{FitError, FitResult};

/// Custom log-prior density over a single parameter value.
pub type LogPriorFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Initial guess, seeding spread and prior for one fit parameter.
#[derive(Clone)]
pub struct Parameter {
    value: f64,
    spread: f64,
    frozen: bool,
    lower: Option<f64>,
    upper: Option<f64>,
    priors: Vec<LogPriorFn>,
}

impl Parameter {
    pub fn new(value: f64, spread: f64) -> Self {
        Self {
            value,
            spread,
            frozen: false,
            lower: None,
            upper: None,
            priors: Vec::new(),
        }
    }

    /// Exclude the parameter from sampling; it is held at `value`.
    pub fn freeze(&self) -> Self {
        Self {
            frozen: true,
            ..self.clone()
        }
    }

    /// Restrict the parameter to `[lim, +inf)`, intersected with any existing bounds.
    pub fn lower_limit(&self, lim: f64) -> Self {
        let lower = match self.lower {
            Some(existing) => existing.max(lim),
            None => lim,
        };
        Self {
            lower: Some(lower),
            ..self.clone()
        }
    }

    /// Restrict the parameter to `(-inf, lim]`, intersected with any existing bounds.
    pub fn upper_limit(&self, lim: f64) -> Self {
        let upper = match self.upper {
            Some(existing) => existing.min(lim),
            None => lim,
        };
        Self {
            upper: Some(upper),
            ..self.clone()
        }
    }

    /// Restrict the parameter to `[lower, upper]`.
    pub fn limits(&self, lower: f64, upper: f64) -> Self {
        self.lower_limit(lower).upper_limit(upper)
    }

    /// Add a custom log-prior. Priors accumulate: each added density is
    /// summed with the ones already attached.
    pub fn log_prior<F>(&self, prior: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let mut priors = self.priors.clone();
        priors.push(Arc::new(prior));
        Self {
            priors,
            ..self.clone()
        }
    }

    /// Central initial guess. Frozen parameters are always evaluated here.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Dispersion of the initial walker cloud around `value`.
    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.lower, self.upper)
    }

    /// Inclusive bound check. A NaN value or bound is never inside.
    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above = self.lower.is_none_or(|l| x >= l);
        let below = self.upper.is_none_or(|u| x <= u);
        above && below
    }

    /// Bounds must be finite and ordered.
    ///
    /// An initial value outside the bounds is not rejected here: it reads as
    /// `-inf` in the posterior and surfaces when the sampler starts.
    pub fn validate(&self) -> FitResult<()> {
        let finite = self.lower.is_none_or(f64::is_finite) && self.upper.is_none_or(f64::is_finite);
        if !finite {
            return Err(FitError::invalid_data("parameter bounds must be finite"));
        }
        if let (Some(l), Some(u)) = (self.lower, self.upper) {
            if l > u {
                return Err(FitError::invalid_data(format!("empty parameter bounds [{l}, {u}]")));
            }
        }
        Ok(())
    }

    /// Log-prior density at `x`: `-inf` outside the bounds, otherwise the sum
    /// of the custom priors (zero when none are attached).
    pub fn log_prior_at(&self, x: f64) -> f64 {
        if !self.contains(x) {
            return f64::NEG_INFINITY;
        }
        let total: f64 = self.priors.iter().map(|p| p(x)).sum();
        if total.is_nan() { f64::NEG_INFINITY } else { total }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("value", &self.value)
            .field("spread", &self.spread)
            .field("frozen", &self.frozen)
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .field("custom_priors", &self.priors.len())
            .finish()
    }
}

/// Number of parameters that are sampled.
pub fn free_count(params: &[Parameter]) -> usize {
    params.iter().filter(|p| !p.is_frozen()).count()
}

/// Rebuild the full parameter vector from a free vector, inserting frozen values.
///
/// `free` must hold exactly [`free_count`] entries; extra entries are ignored
/// and missing ones read as NaN.
pub fn expand_free(params: &[Parameter], free: &[f64]) -> Vec<f64> {
    let mut it = free.iter();
    params
        .iter()
        .map(|p| {
            if p.is_frozen() {
                p.value
            } else {
                it.next().copied().unwrap_or(f64::NAN)
            }
        })
        .collect()
}
