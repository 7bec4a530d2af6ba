//! Shared domain types.
//!
//! These types are kept lightweight and serializable so a fit's inputs and
//! results can be inspected, logged, or stored by callers.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, FitResult};

/// Which error bars enter the likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAxis {
    /// No error bars; the scatter parameter carries all of the variance.
    None,
    Y,
    X,
    Xy,
}

impl ErrorAxis {
    pub fn uses_x(self) -> bool {
        matches!(self, ErrorAxis::X | ErrorAxis::Xy)
    }

    pub fn uses_y(self) -> bool {
        matches!(self, ErrorAxis::Y | ErrorAxis::Xy)
    }
}

/// Per-point censoring tag.
///
/// `YUpper` means the true value lies at or below the recorded `y`; the
/// other variants are analogous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Censoring {
    #[default]
    None,
    YUpper,
    YLower,
    XUpper,
    XLower,
}

impl Censoring {
    pub fn is_censored(self) -> bool {
        self != Censoring::None
    }

    pub fn on_x(self) -> bool {
        matches!(self, Censoring::XUpper | Censoring::XLower)
    }
}

/// A limit attached to a model rather than to a dataset.
///
/// `err` is the 1σ uncertainty on the limited axis. With `err == 0` and no
/// fitted scatter the tail probability collapses to a hard step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CensoredPoint {
    pub x: f64,
    pub y: f64,
    pub err: f64,
    pub direction: Censoring,
}

impl CensoredPoint {
    pub fn new(x: f64, y: f64, direction: Censoring) -> Self {
        Self {
            x,
            y,
            err: 0.0,
            direction,
        }
    }

    pub fn with_error(self, err: f64) -> Self {
        Self { err, ..self }
    }
}

/// Observations with optional error bars and censoring tags.
///
/// Construction validates everything the likelihood relies on, so a
/// `Dataset` in hand is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    xerr: Option<Vec<f64>>,
    yerr: Option<Vec<f64>>,
    censoring: Option<Vec<Censoring>>,
}

impl Dataset {
    pub fn new(x: &[f64], y: &[f64]) -> FitResult<Self> {
        if x.is_empty() {
            return Err(FitError::invalid_data("dataset must contain at least one point"));
        }
        if x.len() != y.len() {
            return Err(FitError::invalid_data(format!(
                "x and y lengths differ: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        check_finite("x", x)?;
        check_finite("y", y)?;
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            xerr: None,
            yerr: None,
            censoring: None,
        })
    }

    pub fn with_xerr(self, xerr: &[f64]) -> FitResult<Self> {
        check_errors("xerr", xerr, self.len())?;
        Ok(Self {
            xerr: Some(xerr.to_vec()),
            ..self
        })
    }

    pub fn with_yerr(self, yerr: &[f64]) -> FitResult<Self> {
        check_errors("yerr", yerr, self.len())?;
        Ok(Self {
            yerr: Some(yerr.to_vec()),
            ..self
        })
    }

    /// Tag points as limits. Tagged points contribute a tail probability
    /// computed with their own error bars.
    pub fn with_censoring(self, tags: &[Censoring]) -> FitResult<Self> {
        if tags.len() != self.len() {
            return Err(FitError::invalid_data(format!(
                "censoring tags length {} does not match data length {}",
                tags.len(),
                self.len()
            )));
        }
        Ok(Self {
            censoring: Some(tags.to_vec()),
            ..self
        })
    }

    /// Require the error bars an error-axis selection reads.
    pub fn require_errors(&self, axis: ErrorAxis) -> FitResult<()> {
        if axis.uses_x() && self.xerr.is_none() {
            return Err(FitError::invalid_data("x error bars are required for this fit"));
        }
        if axis.uses_y() && self.yerr.is_none() {
            return Err(FitError::invalid_data("y error bars are required for this fit"));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn xerr(&self) -> Option<&[f64]> {
        self.xerr.as_deref()
    }

    pub fn yerr(&self) -> Option<&[f64]> {
        self.yerr.as_deref()
    }

    pub fn censoring(&self, i: usize) -> Censoring {
        self.censoring
            .as_ref()
            .and_then(|tags| tags.get(i).copied())
            .unwrap_or_default()
    }
}

fn check_finite(name: &str, values: &[f64]) -> FitResult<()> {
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(FitError::invalid_data(format!(
            "{name}[{i}] is not finite ({})",
            values[i]
        )));
    }
    Ok(())
}

fn check_errors(name: &str, errors: &[f64], n: usize) -> FitResult<()> {
    if errors.len() != n {
        return Err(FitError::invalid_data(format!(
            "{name} length {} does not match data length {n}",
            errors.len()
        )));
    }
    check_finite(name, errors)?;
    if let Some(i) = errors.iter().position(|e| *e <= 0.0) {
        return Err(FitError::invalid_data(format!(
            "{name}[{i}] must be positive, got {}",
            errors[i]
        )));
    }
    Ok(())
}

/// Result of a fitting call.
///
/// All vectors use the full parameter ordering, frozen parameters included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// 50th percentile of each marginal posterior.
    pub values: Vec<f64>,
    /// Half the width of the 16th-84th percentile interval.
    pub errors: Vec<f64>,
    /// Sample covariance; frozen rows and columns are exactly zero.
    pub covariance: Vec<Vec<f64>>,
}
