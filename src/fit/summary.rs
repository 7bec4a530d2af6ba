//! Reduce a chain to point estimates, errors and a covariance matrix.
//!
//! Steps:
//! 1. discard the burn-in prefix (the first half by default)
//! 2. flatten the remaining draws across walkers
//! 3. per free parameter: median, and half the 16th-84th percentile width
//! 4. sample covariance over the free parameters, scattered back into the
//!    full ordering with exact zeros for frozen parameters

use nalgebra::DMatrix;

use crate::domain::{Output, Parameter};
use crate::error::{FitError, FitResult};
use crate::math::{percentile_sorted, sample_covariance, sort_samples};

/// Fraction of recorded steps discarded before summarizing.
pub const DEFAULT_BURN_IN: f64 = 0.5;

/// Summarize a full chain (`[walker][step][parameter]`, frozen included).
///
/// `burn_in` is clamped to `[0, 1)`; at least one step is always kept.
/// Every walker must hold the same number of steps, each with one entry per
/// parameter; anything else is `InvalidData`.
pub fn summarize(chain: &[Vec<Vec<f64>>], params: &[Parameter], burn_in: f64) -> FitResult<Output> {
    let steps = chain.first().map_or(0, Vec::len);
    if steps == 0 {
        return Err(FitError::EmptyChain);
    }
    check_shape(chain, steps, params.len())?;
    let burn_in = if burn_in.is_finite() { burn_in.clamp(0.0, 1.0) } else { DEFAULT_BURN_IN };
    let skip = ((steps as f64 * burn_in).floor() as usize).min(steps - 1);

    let free_idx: Vec<usize> = params
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_frozen())
        .map(|(i, _)| i)
        .collect();

    let draws: Vec<&Vec<f64>> = chain.iter().flat_map(|walker| walker[skip..].iter()).collect();
    let samples = DMatrix::from_fn(draws.len(), free_idx.len(), |r, c| draws[r][free_idx[c]]);

    let full = params.len();
    let mut values: Vec<f64> = params.iter().map(Parameter::value).collect();
    let mut errors = vec![0.0; full];
    for (c, &i) in free_idx.iter().enumerate() {
        let mut column: Vec<f64> = samples.column(c).iter().copied().collect();
        sort_samples(&mut column);
        let (Some(p16), Some(p50), Some(p84)) = (
            percentile_sorted(&column, 16.0),
            percentile_sorted(&column, 50.0),
            percentile_sorted(&column, 84.0),
        ) else {
            return Err(FitError::EmptyChain);
        };
        values[i] = p50;
        errors[i] = 0.5 * (p84 - p16);
    }

    let free_cov = sample_covariance(&samples);
    let mut covariance = vec![vec![0.0; full]; full];
    for (a, &i) in free_idx.iter().enumerate() {
        for (b, &j) in free_idx.iter().enumerate() {
            covariance[i][j] = free_cov[(a, b)];
        }
    }

    Ok(Output {
        values,
        errors,
        covariance,
    })
}

fn check_shape(chain: &[Vec<Vec<f64>>], steps: usize, width: usize) -> FitResult<()> {
    for (w, walker) in chain.iter().enumerate() {
        if walker.len() != steps {
            return Err(FitError::invalid_data(format!(
                "walker {w} holds {} steps, expected {steps}",
                walker.len()
            )));
        }
        if let Some(row) = walker.iter().find(|row| row.len() != width) {
            return Err(FitError::invalid_data(format!(
                "walker {w} has a step with {} entries for {width} parameters",
                row.len()
            )));
        }
    }
    Ok(())
}
