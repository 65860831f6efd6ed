//! Tick index to price conversion and liquidity capacity constants.
//!
//! Prices follow the geometric series `price = 1.0001^tick`. Conversions are
//! computed by exponentiation-by-squaring inside a 36-fractional-digit
//! fixed-point decimal domain, truncating after every multiplication so that
//! results never overstate the available price range.
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::protocol::{
    decimal::trunc_to_price,
    errors::SimulationError,
    safe_math::{safe_div, safe_inverse},
};

pub const MAX_TICK: i32 = 887272;
pub const MIN_TICK: i32 = -MAX_TICK;

/// The geometric base of the tick series.
pub fn tick_base() -> BigDecimal {
    BigDecimal::new(BigInt::from(10_001), 4)
}

/// `sqrt(1.0001)` at the full resolution of the tick price domain.
pub fn tick_base_sqrt() -> BigDecimal {
    BigDecimal::new(BigInt::from(1_000_049_998_750_062_496_094_023_416_993_798_697_u128), 36)
}

/// Upper bound on total liquidity across the whole tick range.
pub fn max_liquidity() -> BigDecimal {
    BigDecimal::from(BigInt::from(3_138_668_841_663_005_800_034_u128))
}

fn check_tick(tick: i32) -> Result<(), SimulationError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(SimulationError::InvalidRange(format!(
            "Tick {tick} outside [{MIN_TICK}, {MAX_TICK}]"
        )));
    }
    Ok(())
}

fn check_spacing(spacing: u32) -> Result<(), SimulationError> {
    if spacing == 0 || spacing > MAX_TICK as u32 {
        return Err(SimulationError::InvalidRange(format!(
            "Tick spacing {spacing} outside [1, {MAX_TICK}]"
        )));
    }
    Ok(())
}

/// Number of valid ticks for a given spacing, symmetric around zero.
fn number_of_ticks(spacing: u32) -> u32 {
    2 * (MAX_TICK as u32 / spacing) + 1
}

/// Maximum liquidity a single tick may carry for a given spacing, such that
/// the fully populated tick range stays within [`max_liquidity`].
pub fn max_liquidity_per_tick(spacing: u32) -> Result<BigDecimal, SimulationError> {
    check_spacing(spacing)?;
    safe_div(&max_liquidity(), &BigDecimal::from(number_of_ticks(spacing)))
}

/// Truncates a tick onto the spacing grid.
pub fn align_tick(tick: i32, spacing: u32) -> Result<i32, SimulationError> {
    check_spacing(spacing)?;
    Ok((tick / spacing as i32) * spacing as i32)
}

/// Exponentiation by squaring inside the truncating tick price domain.
fn pow_tick(base: &BigDecimal, exp: i32) -> Result<BigDecimal, SimulationError> {
    if exp < 0 {
        let inverted = trunc_to_price(&safe_inverse(base)?);
        return pow_tick(&inverted, -exp);
    }
    let mut result = BigDecimal::one();
    let mut factor = base.clone();
    let mut remaining = exp as u32;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = trunc_to_price(&(&result * &factor));
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = trunc_to_price(&(&factor * &factor));
        }
    }
    Ok(result)
}

/// Price at `tick`, `1.0001^tick`.
pub fn tick_to_price(tick: i32) -> Result<BigDecimal, SimulationError> {
    check_tick(tick)?;
    pow_tick(&tick_base(), tick)
}

/// Sqrt-price at `tick`, `sqrt(1.0001)^tick`.
pub fn tick_to_price_sqrt(tick: i32) -> Result<BigDecimal, SimulationError> {
    check_tick(tick)?;
    pow_tick(&tick_base_sqrt(), tick)
}

/// The largest tick whose price does not exceed `price`, clamped to the
/// representable tick range. Fails for non-positive prices.
pub fn price_to_tick(price: &BigDecimal) -> Result<i32, SimulationError> {
    if price <= &BigDecimal::zero() {
        return Err(SimulationError::InvalidPrice(format!("Price must be positive, got {price}")));
    }
    if *price < tick_to_price(MIN_TICK)? {
        return Ok(MIN_TICK);
    }
    let (mut low, mut high) = (MIN_TICK, MAX_TICK);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if tick_to_price(mid)? <= *price {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}
