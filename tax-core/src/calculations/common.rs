//! Decimal helpers shared by the calculator, the importer and display code.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents, with midpoints going away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(287.4804)), dec!(287.48));
/// assert_eq!(round_half_up(dec!(2084.505)), dec!(2084.51));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the larger of two values.
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// True when `rate` is a fraction in `[0, 1]`.
pub fn is_valid_rate(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn round_half_up_truncates_sub_cent_remainder() {
        assert_eq!(round_half_up(dec!(3669.0049)), dec!(3669.00));
    }

    #[test]
    fn round_half_up_rounds_midpoint_up() {
        assert_eq!(round_half_up(dec!(0.125)), dec!(0.13));
    }

    #[test]
    fn round_half_up_midpoint_negative_goes_away_from_zero() {
        assert_eq!(round_half_up(dec!(-0.125)), dec!(-0.13));
    }

    #[test]
    fn max_picks_larger() {
        assert_eq!(max(dec!(-5), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(max(dec!(12.5), dec!(12.4)), dec!(12.5));
    }

    #[test]
    fn valid_rate_bounds_are_inclusive() {
        assert!(is_valid_rate(Decimal::ZERO));
        assert!(is_valid_rate(Decimal::ONE));
        assert!(is_valid_rate(dec!(0.94)));
        assert!(!is_valid_rate(dec!(1.01)));
        assert!(!is_valid_rate(dec!(-0.01)));
    }
}
