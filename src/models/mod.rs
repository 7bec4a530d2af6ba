//! Parametric model functions.
//!
//! Models are small, pure values so that the posterior builder and sampler
//! can stay generic over the functional form.

pub mod model;

pub use model::*;
