//! `bayes-fit` library crate.
//!
//! Bayesian curve fitting with an affine-invariant ensemble sampler:
//!
//! - parameters carry priors, hard limits and an initial spread
//! - data may carry x and/or y errors, intrinsic scatter and censored points
//! - results are medians, 1-sigma widths and a covariance matrix
//!
//! Most callers only need [`Model`] (or the [`LINE`] / [`POWER_LAW`]
//! statics) and [`Parameter`]. [`ModelPdf`] and [`Sampler`] are exposed for
//! callers that want to drive the chain themselves.

pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod report;

pub use domain::{CensoredPoint, Censoring, Dataset, ErrorAxis, Output, Parameter};
pub use error::{FitError, FitResult};
pub use fit::{
    Chain, ConvergenceTest, LINE, LINE_PDF, LogPdf, Model, ModelOptions, ModelPdf, POWER_LAW,
    POWER_LAW_PDF, Sampler, SamplerConfig, gelman_rubin, summarize,
};
pub use models::{Curve, DataSpace};
pub use report::format_output;
