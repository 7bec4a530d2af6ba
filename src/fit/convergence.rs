//! Convergence tests evaluated against accumulated chain history.
//!
//! Tests are plain values; [`ConvergenceTest::All`] is the explicit AND
//! combinator. A test reads a chain indexed `[walker][step][parameter]`,
//! which inside the sampler holds only the free parameters.

use serde::{Deserialize, Serialize};

use crate::math::{mean, variance};

/// Minimum chain length of the default test.
pub const DEFAULT_MIN_STEPS: usize = 1_000;

/// R-hat limit of the default test.
pub const DEFAULT_RHAT_LIMIT: f64 = 1.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvergenceTest {
    /// Passes when every parameter's R-hat is at most the limit.
    GelmanRubin(f64),
    /// Passes once at least this many steps are recorded.
    Steps(usize),
    /// Passes when every contained test passes.
    All(Vec<ConvergenceTest>),
}

impl Default for ConvergenceTest {
    /// `Steps(1000)` AND `GelmanRubin(1.1)`.
    fn default() -> Self {
        ConvergenceTest::All(vec![
            ConvergenceTest::Steps(DEFAULT_MIN_STEPS),
            ConvergenceTest::GelmanRubin(DEFAULT_RHAT_LIMIT),
        ])
    }
}

impl ConvergenceTest {
    pub fn is_satisfied(&self, chain: &[Vec<Vec<f64>>]) -> bool {
        match self {
            ConvergenceTest::Steps(n) => chain_len(chain) >= *n,
            ConvergenceTest::GelmanRubin(lim) => match gelman_rubin(chain) {
                Some(rhat) => rhat.iter().all(|r| *r <= *lim),
                None => false,
            },
            ConvergenceTest::All(tests) => tests.iter().all(|t| t.is_satisfied(chain)),
        }
    }
}

fn chain_len(chain: &[Vec<Vec<f64>>]) -> usize {
    chain.first().map_or(0, Vec::len)
}

/// Gelman-Rubin R-hat per parameter, treating each walker as a chain.
///
/// Returns `None` when fewer than two walkers or two steps are available.
/// A parameter with zero within- and between-chain variance has R-hat 1;
/// zero within-chain variance with spread between chains gives `+inf`.
pub fn gelman_rubin(chain: &[Vec<Vec<f64>>]) -> Option<Vec<f64>> {
    let walkers = chain.len();
    let n = chain_len(chain);
    if walkers < 2 || n < 2 {
        return None;
    }
    let dims = chain[0][0].len();
    let nf = n as f64;

    let rhat = (0..dims)
        .map(|d| {
            let mut means = Vec::with_capacity(walkers);
            let mut within = Vec::with_capacity(walkers);
            for walker in chain {
                let series: Vec<f64> = walker.iter().map(|step| step[d]).collect();
                means.push(mean(&series));
                within.push(variance(&series));
            }
            let w = mean(&within);
            // B / N is the variance of the chain means.
            let b_over_n = variance(&means);

            if w <= 0.0 {
                return if b_over_n <= 0.0 { 1.0 } else { f64::INFINITY };
            }
            ((nf - 1.0) / nf + b_over_n / w).sqrt()
        })
        .collect();
    Some(rhat)
}
