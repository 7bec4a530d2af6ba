//! Gaussian log-densities and log-tail probabilities.
//!
//! Numerical notes:
//! - Tail probabilities are computed through `erfc` so the far tail keeps
//!   relative precision instead of cancelling against 1.
//! - Below `DEEP_TAIL_Z` even `erfc` underflows; we switch to the leading
//!   terms of the asymptotic (Mills ratio) expansion, which keeps censored
//!   likelihood terms finite and monotone.
//! - A zero width collapses the tail to a hard step (`0` or `-inf`).

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use statrs::function::erf::erfc;

/// Below this standard score the asymptotic expansion is used.
const DEEP_TAIL_Z: f64 = -30.0;

/// `ln N(r; 0, var)`.
pub fn log_normal_pdf(residual: f64, var: f64) -> f64 {
    -0.5 * (residual * residual / var + (2.0 * PI * var).ln())
}

/// `ln Φ(z)` for the standard normal CDF.
pub fn log_normal_cdf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z < DEEP_TAIL_Z {
        // Φ(z) ≈ φ(z)/(-z) * (1 - 1/z² + 3/z⁴)
        let z2 = z * z;
        let series = 1.0 - 1.0 / z2 + 3.0 / (z2 * z2);
        return -0.5 * z2 - 0.5 * (2.0 * PI).ln() - (-z).ln() + series.ln();
    }
    if z > 0.0 {
        // Φ(z) = 1 - erfc(z/√2)/2
        (-0.5 * erfc(z * FRAC_1_SQRT_2)).ln_1p()
    } else {
        (0.5 * erfc(-z * FRAC_1_SQRT_2)).ln()
    }
}

/// `ln P(X <= bound)` for `X ~ N(mean, sigma²)`.
pub fn log_prob_below(bound: f64, mean: f64, sigma: f64) -> f64 {
    let d = bound - mean;
    if sigma <= 0.0 {
        return if d >= 0.0 { 0.0 } else { f64::NEG_INFINITY };
    }
    log_normal_cdf(d / sigma)
}

/// `ln P(X >= bound)` for `X ~ N(mean, sigma²)`.
pub fn log_prob_above(bound: f64, mean: f64, sigma: f64) -> f64 {
    let d = mean - bound;
    if sigma <= 0.0 {
        return if d >= 0.0 { 0.0 } else { f64::NEG_INFINITY };
    }
    log_normal_cdf(d / sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_matches_closed_form() {
        let v = log_normal_pdf(0.0, 1.0);
        assert!((v + 0.5 * (2.0 * PI).ln()).abs() < 1e-12);
        let w = log_normal_pdf(2.0, 4.0);
        assert!((w - (-0.5 * (1.0 + (8.0 * PI).ln()))).abs() < 1e-12);
    }

    #[test]
    fn cdf_reference_values() {
        assert!((log_normal_cdf(0.0) - 0.5f64.ln()).abs() < 1e-12);
        // Φ(1) = 0.841344746...
        assert!((log_normal_cdf(1.0) - 0.841_344_746_068_543f64.ln()).abs() < 1e-9);
        // Φ(-2) = 0.022750131948...
        assert!((log_normal_cdf(-2.0) - 0.022_750_131_948_179_2f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn deep_tail_is_finite_and_monotone() {
        let mut prev = log_normal_cdf(-25.0);
        for i in 1..100 {
            let z = -25.0 - i as f64;
            let v = log_normal_cdf(z);
            assert!(v.is_finite(), "z={z}");
            assert!(v < prev, "z={z}: {v} >= {prev}");
            prev = v;
        }
    }

    #[test]
    fn asymptotic_branch_joins_erfc_branch() {
        let a = log_normal_cdf(DEEP_TAIL_Z + 1e-9);
        let b = log_normal_cdf(DEEP_TAIL_Z - 1e-9);
        assert!((a - b).abs() < 1e-6, "{a} vs {b}");
    }

    #[test]
    fn zero_width_is_a_hard_step() {
        assert_eq!(log_prob_below(1.0, 0.5, 0.0), 0.0);
        assert_eq!(log_prob_below(1.0, 1.5, 0.0), f64::NEG_INFINITY);
        assert_eq!(log_prob_above(1.0, 1.5, 0.0), 0.0);
        assert_eq!(log_prob_above(1.0, 0.5, 0.0), f64::NEG_INFINITY);
    }
}
