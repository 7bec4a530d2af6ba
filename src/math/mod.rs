//! Mathematical utilities: Gaussian log-densities and sample statistics.

pub mod gaussian;
pub mod stats;

pub use gaussian::*;
pub use stats::*;
