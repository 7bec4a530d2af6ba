//! Sample statistics over flattened chains.
//!
//! Percentiles use linear interpolation between order statistics (the
//! "type 7" definition), so the 50th percentile of an even-length sample is
//! the mean of the two middle values.

use nalgebra::DMatrix;

/// Sort a sample in place, NaNs last.
pub fn sort_samples(values: &mut [f64]) {
    values.sort_by(f64::total_cmp);
}

/// Percentile `q` in `[0, 100]` of an already sorted sample.
///
/// Returns `None` for an empty sample.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 100.0) / 100.0;
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (`n - 1` denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample covariance of the columns of `samples` (rows are draws).
///
/// Returns a zero matrix when fewer than two draws are available.
pub fn sample_covariance(samples: &DMatrix<f64>) -> DMatrix<f64> {
    let (n, d) = samples.shape();
    if n < 2 {
        return DMatrix::zeros(d, d);
    }
    let means = samples.row_mean();
    let mut centered = samples.clone();
    for mut row in centered.row_iter_mut() {
        row -= &means;
    }
    (centered.transpose() * &centered) / (n - 1) as f64
}
