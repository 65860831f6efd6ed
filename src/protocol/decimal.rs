//! Rounding and scale helpers for the decimal domains used by the engine.
//!
//! Three fixed scales are in play: token amounts settle at 18 fractional
//! digits (atto granularity), derived liquidity is floored at 64 fractional
//! digits, and tick prices live in a 36-fractional-digit truncating
//! fixed-point domain. Rounding is always explicit about its direction; no
//! global rounding state is involved.
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;

/// Fractional digits at which token amounts settle (one atto unit = 1e-18).
pub const AMOUNT_SCALE: i64 = 18;

/// Fractional digits kept when flooring derived liquidity.
pub const LIQUIDITY_SCALE: i64 = 64;

/// Fractional digits of the fixed-point domain used for tick prices.
pub const PRICE_SCALE: i64 = 36;

/// The smallest settleable token amount, 1e-18.
pub fn atto() -> BigDecimal {
    BigDecimal::new(BigInt::from(1), AMOUNT_SCALE)
}

/// Two atto units: the margin subtracted from requested amounts before
/// liquidity inversion, and the dust threshold below which residual amounts
/// are not refunded.
pub fn precision_margin() -> BigDecimal {
    BigDecimal::new(BigInt::from(2), AMOUNT_SCALE)
}

pub fn floor_to(value: &BigDecimal, scale: i64) -> BigDecimal {
    value.with_scale_round(scale, RoundingMode::Floor)
}

pub fn ceil_to(value: &BigDecimal, scale: i64) -> BigDecimal {
    value.with_scale_round(scale, RoundingMode::Ceiling)
}

/// Rounds an outgoing amount down to atto granularity.
pub fn floor_to_amount(value: &BigDecimal) -> BigDecimal {
    floor_to(value, AMOUNT_SCALE)
}

/// Rounds a required amount up to atto granularity.
pub fn ceil_to_amount(value: &BigDecimal) -> BigDecimal {
    ceil_to(value, AMOUNT_SCALE)
}

/// Truncates a value into the 36-fractional-digit tick price domain.
pub fn trunc_to_price(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(PRICE_SCALE, RoundingMode::Down)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[rstest]
    #[case::drops_sub_atto("1.0000000000000000019", "1.000000000000000001")]
    #[case::already_settled("2.5", "2.5")]
    #[case::below_one_atto("0.0000000000000000009", "0")]
    fn test_floor_to_amount(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(floor_to_amount(&dec(value)), dec(expected));
    }

    #[rstest]
    #[case::rounds_up("1.0000000000000000011", "1.000000000000000002")]
    #[case::already_settled("2.5", "2.5")]
    #[case::below_one_atto("0.0000000000000000009", "0.000000000000000001")]
    fn test_ceil_to_amount(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(ceil_to_amount(&dec(value)), dec(expected));
    }

    #[test]
    fn test_trunc_to_price_truncates_toward_zero() {
        let value = dec("1.0000000000000000000000000000000000019");
        assert_eq!(trunc_to_price(&value), dec("1.000000000000000000000000000000000001"));
    }

    #[test]
    fn test_atto_and_margin() {
        assert_eq!(atto(), dec("0.000000000000000001"));
        assert_eq!(precision_margin(), dec("0.000000000000000002"));
        assert_eq!(&atto() + &atto(), precision_margin());
    }
}
