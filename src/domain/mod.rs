//! Domain types used throughout the fitting pipeline.
//!
//! This module defines:
//!
//! - fit parameter descriptions (`Parameter`)
//! - observations with error bars and censoring tags (`Dataset`, `CensoredPoint`)
//! - error-axis selection (`ErrorAxis`)
//! - fit outputs (`Output`)

pub mod parameter;
pub mod types;

pub use parameter::*;
pub use types::*;
