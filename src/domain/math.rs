//! Floating-point tolerance primitives.
//!
//! Every loop-termination and "fully filled" decision in the engine
//! routes through these comparisons. Using raw `==` on f64 money
//! amounts either spins fill loops forever or double-pays by an
//! epsilon, so the tolerance is a first-class primitive here rather
//! than an ad-hoc constant scattered across call sites.

/// Absolute tolerance for money/share/probability comparisons.
pub const EPSILON: f64 = 1e-9;

/// True when `a` and `b` are within [`EPSILON`] of each other.
#[must_use]
pub fn float_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// True when `a > b` beyond tolerance, or tolerance-equal to `b`.
#[must_use]
pub fn float_gte(a: f64, b: f64) -> bool {
    a > b - EPSILON
}

/// True when `a < b` beyond tolerance, or tolerance-equal to `b`.
#[must_use]
pub fn float_lte(a: f64, b: f64) -> bool {
    a < b + EPSILON
}

/// Normal probability density of `x` under N(mean, variance).
///
/// `variance == 0` degenerates to a point mass: infinite density at
/// the mean, zero elsewhere.
#[must_use]
pub fn norm_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    if variance == 0.0 {
        return if x == mean { f64::INFINITY } else { 0.0 };
    }
    (-0.5 * (x - mean).powi(2) / variance).exp()
        / (std::f64::consts::TAU * variance).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_within_tolerance() {
        assert!(float_equal(1.0, 1.0 + 1e-12));
        assert!(!float_equal(1.0, 1.0 + 1e-6));
    }

    #[test]
    fn test_gte_lte_at_boundary() {
        assert!(float_gte(0.5, 0.5));
        assert!(float_lte(0.5, 0.5));
        assert!(float_gte(0.5 - 1e-12, 0.5));
        assert!(float_lte(0.5 + 1e-12, 0.5));
        assert!(!float_gte(0.4, 0.5));
        assert!(!float_lte(0.6, 0.5));
    }

    #[test]
    fn test_norm_pdf_peaks_at_mean() {
        let at_mean = norm_pdf(0.3, 0.3, 0.005);
        let off_mean = norm_pdf(0.5, 0.3, 0.005);
        assert!(at_mean > off_mean);
    }

    #[test]
    fn test_norm_pdf_zero_variance() {
        assert_eq!(norm_pdf(0.3, 0.3, 0.0), f64::INFINITY);
        assert_eq!(norm_pdf(0.4, 0.3, 0.0), 0.0);
    }
}
