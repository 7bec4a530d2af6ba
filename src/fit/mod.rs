//! Bayesian fitting.
//!
//! Responsibilities:
//!
//! - build log-posteriors from a curve, data and priors (`posterior`)
//! - sample them with an affine-invariant ensemble (`sampler`)
//! - decide when sampling has converged (`convergence`)
//! - reduce chains to point estimates and covariances (`summary`)
//! - tie the above together per functional form (`fitter`)

pub mod convergence;
pub mod fitter;
pub mod posterior;
pub mod sampler;
pub mod summary;

pub use convergence::*;
pub use fitter::*;
pub use posterior::*;
pub use sampler::*;
pub use summary::*;
