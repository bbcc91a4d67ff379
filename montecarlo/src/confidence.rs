//! The Gaussian confidence multiplier.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

use crate::error::{EstimatorErr, Result};

const MAX_ITERATIONS: usize = 1000;
const EPSILON: f64 = 1e-12;

/// The Gaussian tail probability `Q(x) = P(Z > x)`.
pub fn q(x: f64) -> f64 {
    0.5 * erfc(x / SQRT_2)
}

/// Returns `z` such that `Q(z) = (1 - confidence) / 2`.
///
/// # Errors
/// Returns `EstimatorErr::InvalidConfidence` unless `0.5 < confidence < 1.0`.
pub fn cfactor(confidence: f64) -> Result<f64> {
    if !(confidence > 0.5 && confidence < 1.0) {
        return Err(EstimatorErr::InvalidConfidence(confidence));
    }

    Ok(secant(q, (1.0 - confidence) / 2.0, 0.0, 1.0))
}

/// Solves `f(x) = y` with the secant method, starting from `x0` and `x1`.
fn secant(f: impl Fn(f64) -> f64, y: f64, mut x0: f64, mut x1: f64) -> f64 {
    let mut f0 = f(x0) - y;
    let mut f1 = f(x1) - y;

    for _ in 0..MAX_ITERATIONS {
        if f1 == f0 {
            break;
        }

        let x2 = x1 - f1 * (x1 - x0) / (f1 - f0);
        (x0, f0) = (x1, f1);
        x1 = x2;
        f1 = f(x1) - y;

        if (x1 - x0).abs() <= EPSILON * x1.abs().max(1.0) {
            break;
        }
    }

    x1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_five_percent_is_about_1_96() {
        let z = cfactor(0.95).unwrap();
        assert!((z - 1.959964).abs() < 1e-5, "got {z}");
    }

    #[test]
    fn known_quantiles() {
        for (c, expected) in [(0.6827, 1.0), (0.99, 2.575829), (0.999, 3.290527)] {
            let z = cfactor(c).unwrap();
            assert!((z - expected).abs() < 1e-3, "c={c}: got {z}");
        }
    }

    #[test]
    fn strictly_increasing_in_confidence() {
        let levels = [0.51, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99, 0.999, 0.999_999];
        let factors: Vec<_> = levels.iter().map(|&c| cfactor(c).unwrap()).collect();

        for pair in factors.windows(2) {
            assert!(pair[0] < pair[1], "{factors:?}");
        }
    }

    #[test]
    fn rejects_out_of_range_levels() {
        for c in [0.5, 1.0, 0.2, 1.5, f64::NAN] {
            assert!(matches!(cfactor(c), Err(EstimatorErr::InvalidConfidence(_))));
        }
    }

    #[test]
    fn q_is_a_tail_probability() {
        assert!((q(0.0) - 0.5).abs() < 1e-15);
        assert!(q(1.0) < q(0.5));
        assert!(q(8.0) < 1e-14);
    }
}
