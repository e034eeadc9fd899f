//! Data Sanitization
//!
//! Numerical stability utilities shared by the scoring modules.
//!
//! Functions:
//! - Invalid value detection
//! - Finite clamping with fallback
//! - Fixed-precision rounding

/// Check whether a slice contains NaN or Inf
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Clamp into `[min, max]`; non-finite input maps to `fallback`
pub fn clamp_finite(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        return fallback;
    }
    if value.is_infinite() {
        return if value > 0.0 { max } else { min };
    }
    value.clamp(min, max)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_invalid_values() {
        assert!(!has_invalid_values(&[1.0, 2.0, 3.0]));
        assert!(!has_invalid_values(&[]));
        assert!(has_invalid_values(&[1.0, f64::NAN]));
        assert!(has_invalid_values(&[f64::NEG_INFINITY, 2.0]));
    }

    #[test]
    fn test_clamp_finite() {
        assert_eq!(clamp_finite(0.5, 0.0, 1.0, 0.0), 0.5);
        assert_eq!(clamp_finite(2.0, 0.0, 1.0, 0.0), 1.0);
        assert_eq!(clamp_finite(f64::NAN, -1.5, 1.5, 0.0), 0.0);
        assert_eq!(clamp_finite(f64::INFINITY, -1.5, 1.5, 0.0), 1.5);
        assert_eq!(clamp_finite(f64::NEG_INFINITY, -1.5, 1.5, 0.0), -1.5);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(0.1 + 0.2, 4), 0.3);
        assert_eq!(round_to(-2.3562, 2), -2.36);
    }
}
