//! Crate-wide error type.
//!
//! Every data-dependent failure of a fitting call is returned as a value.
//! Evaluating a log-posterior never errors (it returns `-inf` instead), and
//! the pure builders (`Parameter` modifiers, `ModelPdf` constructors) cannot
//! fail at all.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// The dataset is malformed (length mismatch, empty, non-finite values,
    /// non-positive error bars, a parameter outside its own bounds, ...).
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// `samples` reached its iteration cap before the convergence tests passed.
    #[error("sampler did not converge within {steps} steps")]
    NotConverged { steps: usize },
    /// Every walker started at zero posterior probability.
    #[error("all {walkers} walkers have a log-probability of -inf after initialization")]
    Degenerate { walkers: usize },
    /// Sampler settings incompatible with the problem (programmer error).
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(String),
    /// `raw_samples` was asked for zero steps.
    #[error("raw sample count must be positive")]
    InvalidSteps,
    /// A chain without recorded steps cannot be summarized.
    #[error("cannot summarize an empty chain")]
    EmptyChain,
}

impl FitError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        FitError::InvalidData(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        FitError::InvalidConfig(message.into())
    }

    /// True for errors caused by misuse of the API rather than by the data.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, FitError::InvalidConfig(_) | FitError::InvalidSteps)
    }
}

pub type FitResult<T> = Result<T, FitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_violations_are_distinguished_from_data_errors() {
        assert!(FitError::InvalidSteps.is_contract_violation());
        assert!(FitError::invalid_config("walkers").is_contract_violation());
        assert!(!FitError::invalid_data("length").is_contract_violation());
        assert!(!FitError::NotConverged { steps: 10 }.is_contract_violation());
        assert!(!FitError::Degenerate { walkers: 4 }.is_contract_violation());
    }

    #[test]
    fn messages_carry_context() {
        let msg = FitError::NotConverged { steps: 500 }.to_string();
        assert!(msg.contains("500"), "{msg}");
    }
}
