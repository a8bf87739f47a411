//! Fixed-point scoring arithmetic.
//!
//! Target scores mix ratios ("80% of combined biomass", "nutrients per
//! tile of travel") that would drift between platforms in floating point.
//! Every score is an [`I32F32`] built with saturating operations so large
//! biomass values clamp instead of overflowing.

use fixed::types::I32F32;

/// Fixed-point score type.
///
/// 32 integer bits and 32 fractional bits, range roughly ±2.1e9.
pub type Score = I32F32;

/// Convert an integer into a score, clamping at the representable range.
#[must_use]
pub fn score(value: i64) -> Score {
    Score::saturating_from_num(value)
}

/// `numerator / denominator` as a score, with the denominator floored at 1.
#[must_use]
pub fn ratio(numerator: i64, denominator: i64) -> Score {
    score(numerator).saturating_div(score(denominator.max(1)))
}

/// `value * percent / 100` as a score.
#[must_use]
pub fn percent_of(value: i64, percent: i64) -> Score {
    score(value).saturating_mul(score(percent)).saturating_div(score(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_floors_denominator() {
        assert_eq!(ratio(10, 0), score(10));
        assert_eq!(ratio(10, 4), Score::from_num(2.5));
    }

    #[test]
    fn test_percent_is_exact() {
        assert_eq!(percent_of(120, 40), score(48));
        assert_eq!(percent_of(5, 80), score(4));
    }

    #[test]
    fn test_saturation_instead_of_overflow() {
        let huge = score(i64::MAX);
        assert_eq!(huge, Score::MAX);
        assert_eq!(huge.saturating_mul(score(1000)), Score::MAX);
    }

    #[test]
    fn test_fixed_determinism() {
        let a = ratio(1, 3);
        let b = ratio(1, 3);
        assert_eq!(a, b);
        assert_eq!(a.saturating_mul(score(7)), b.saturating_mul(score(7)));
    }
}
