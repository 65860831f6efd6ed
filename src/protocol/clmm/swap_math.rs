//! Per-step swap math: the closed-form price update, step deltas and the
//! fee split.
//!
//! Rounding discipline across the module: amounts paid out of the pool are
//! floored, amounts required as fee-inclusive input are ceiled. The engine
//! relies on this exact direction per operation.
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::protocol::{
    decimal::{ceil_to_amount, floor_to_amount},
    errors::SimulationError,
    safe_math::safe_div,
};

/// Cap on the input fee rate.
pub fn input_fee_rate_max() -> BigDecimal {
    BigDecimal::new(BigInt::from(1), 1)
}

/// Cap on the protocol's share of the collected fee.
pub fn fee_protocol_share_max() -> BigDecimal {
    BigDecimal::new(BigInt::from(25), 2)
}

pub fn validate_fee_rates(
    fee_rate: &BigDecimal,
    protocol_share: &BigDecimal,
) -> Result<(), SimulationError> {
    if fee_rate < &BigDecimal::zero() || fee_rate > &input_fee_rate_max() {
        return Err(SimulationError::InvalidFeeRate(format!(
            "Input fee rate {fee_rate} outside [0, {}]",
            input_fee_rate_max()
        )));
    }
    if protocol_share < &BigDecimal::zero() || protocol_share > &fee_protocol_share_max() {
        return Err(SimulationError::InvalidFeeRate(format!(
            "Protocol fee share {protocol_share} outside [0, {}]",
            fee_protocol_share_max()
        )));
    }
    Ok(())
}

/// Splits a gross input amount into `(net, lp_fee, protocol_fee)`.
pub(crate) fn split_fee(
    amount: &BigDecimal,
    fee_rate: &BigDecimal,
    protocol_share: &BigDecimal,
) -> (BigDecimal, BigDecimal, BigDecimal) {
    let fee_total = amount * fee_rate;
    let fee_protocol = &fee_total * protocol_share;
    let fee_lp = &fee_total - &fee_protocol;
    let net = amount - &fee_total;
    (net, fee_lp, fee_protocol)
}

/// Candidate sqrt-price after consuming `input_net` against the active
/// liquidity: hyperbolic for X input (price moves down), linear for Y input
/// (price moves up), both from the virtual-reserve invariant
/// `L = P * virtual_y = virtual_x / P`.
pub(crate) fn next_price_sqrt(
    active_liquidity: &BigDecimal,
    price_sqrt: &BigDecimal,
    input_net: &BigDecimal,
    input_is_x: bool,
) -> Result<BigDecimal, SimulationError> {
    if input_is_x {
        let numerator = active_liquidity * price_sqrt;
        let denominator = active_liquidity + input_net * price_sqrt;
        safe_div(&numerator, &denominator)
    } else {
        Ok(safe_div(input_net, active_liquidity)? + price_sqrt)
    }
}

/// Exact X moved across a sqrt-price interval: `|L/a - L/b|`.
pub(crate) fn x_delta(
    active_liquidity: &BigDecimal,
    price_a_sqrt: &BigDecimal,
    price_b_sqrt: &BigDecimal,
) -> Result<BigDecimal, SimulationError> {
    let delta =
        safe_div(active_liquidity, price_a_sqrt)? - safe_div(active_liquidity, price_b_sqrt)?;
    Ok(delta.abs())
}

/// Exact Y moved across a sqrt-price interval: `L * |a - b|`.
pub(crate) fn y_delta(
    active_liquidity: &BigDecimal,
    price_a_sqrt: &BigDecimal,
    price_b_sqrt: &BigDecimal,
) -> BigDecimal {
    active_liquidity * (price_a_sqrt - price_b_sqrt).abs()
}

/// Net input required to traverse the interval, ceiled to atto granularity.
pub(crate) fn input_in_step(
    active_liquidity: &BigDecimal,
    price_a_sqrt: &BigDecimal,
    price_b_sqrt: &BigDecimal,
    input_is_x: bool,
) -> Result<BigDecimal, SimulationError> {
    let delta = if input_is_x {
        x_delta(active_liquidity, price_a_sqrt, price_b_sqrt)?
    } else {
        y_delta(active_liquidity, price_a_sqrt, price_b_sqrt)
    };
    Ok(ceil_to_amount(&delta))
}

/// Output released by traversing the interval, floored to atto granularity.
pub(crate) fn output_in_step(
    active_liquidity: &BigDecimal,
    price_a_sqrt: &BigDecimal,
    price_b_sqrt: &BigDecimal,
    input_is_x: bool,
) -> Result<BigDecimal, SimulationError> {
    let delta = if input_is_x {
        y_delta(active_liquidity, price_a_sqrt, price_b_sqrt)
    } else {
        x_delta(active_liquidity, price_a_sqrt, price_b_sqrt)?
    };
    Ok(floor_to_amount(&delta))
}

/// Re-grosses a net step input to include the fee taken from it.
pub(crate) fn gross_up_input(
    input_net: &BigDecimal,
    fee_rate: &BigDecimal,
) -> Result<BigDecimal, SimulationError> {
    safe_div(input_net, &(BigDecimal::one() - fee_rate))
}
