//! Liquidity to token amount inversion for adding and removing positions.
//!
//! The three price regimes relative to a range `[left, right)`:
//! below the range only X backs the position, inside it both tokens do, and
//! at or above it only Y does. Virtual reserves follow
//! `L = P * virtual_y = virtual_x / P` in sqrt-price terms.
use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::protocol::{
    decimal::{atto, ceil_to_amount, floor_to, floor_to_amount, precision_margin, LIQUIDITY_SCALE},
    errors::SimulationError,
    safe_math::{safe_div, safe_inverse},
};

/// Token amounts backing `liquidity` over a range at the current sqrt-price.
/// Exact forward formulas, no rounding.
pub(crate) fn amounts_for_liquidity(
    liquidity: &BigDecimal,
    price_sqrt: &BigDecimal,
    price_left_sqrt: &BigDecimal,
    price_right_sqrt: &BigDecimal,
) -> Result<(BigDecimal, BigDecimal), SimulationError> {
    if price_sqrt < price_left_sqrt {
        let x = liquidity * (safe_inverse(price_left_sqrt)? - safe_inverse(price_right_sqrt)?);
        Ok((x, BigDecimal::zero()))
    } else if price_sqrt < price_right_sqrt {
        let x = liquidity * (safe_inverse(price_sqrt)? - safe_inverse(price_right_sqrt)?);
        let y = liquidity * (price_sqrt - price_left_sqrt);
        Ok((x, y))
    } else {
        let y = liquidity * (price_right_sqrt - price_left_sqrt);
        Ok((BigDecimal::zero(), y))
    }
}

/// Implied liquidity per token side for the given amounts. `None` marks a
/// side that places no constraint in the current regime, including exact
/// alignment of the price with a range bound.
pub(crate) fn liquidity_from_amounts(
    x_amount: &BigDecimal,
    y_amount: &BigDecimal,
    price_sqrt: &BigDecimal,
    price_left_sqrt: &BigDecimal,
    price_right_sqrt: &BigDecimal,
) -> Result<(Option<BigDecimal>, Option<BigDecimal>), SimulationError> {
    if price_sqrt < price_left_sqrt {
        let x_scale = safe_inverse(price_left_sqrt)? - safe_inverse(price_right_sqrt)?;
        Ok((Some(safe_div(x_amount, &x_scale)?), None))
    } else if price_sqrt < price_right_sqrt {
        let liquidity_x = if price_sqrt != price_right_sqrt {
            let x_scale = safe_inverse(price_sqrt)? - safe_inverse(price_right_sqrt)?;
            Some(safe_div(x_amount, &x_scale)?)
        } else {
            None
        };
        let liquidity_y = if price_sqrt != price_left_sqrt {
            let y_scale = price_sqrt - price_left_sqrt;
            Some(safe_div(y_amount, &y_scale)?)
        } else {
            None
        };
        Ok((liquidity_x, liquidity_y))
    } else {
        let y_scale = price_right_sqrt - price_left_sqrt;
        Ok((None, Some(safe_div(y_amount, &y_scale)?)))
    }
}

/// Sizes an add-liquidity call: the liquidity granted for the requested
/// amounts and the amounts the caller must actually supply for it.
///
/// A two atto safety margin is deducted before inversion so that the
/// ceiling-rounded requirements never exceed the requested amounts, derived
/// liquidity is floored to bounded precision and silently clamped to
/// `max_liquidity`, and residual differences within the margin are treated
/// as consumed rather than refunded.
pub fn allowed_amounts(
    x_amount: &BigDecimal,
    y_amount: &BigDecimal,
    price_sqrt: &BigDecimal,
    price_left_sqrt: &BigDecimal,
    price_right_sqrt: &BigDecimal,
    max_liquidity: &BigDecimal,
) -> Result<(BigDecimal, BigDecimal, BigDecimal), SimulationError> {
    let margin = precision_margin();
    let x_safe = (x_amount - &margin).max(BigDecimal::zero());
    let y_safe = (y_amount - &margin).max(BigDecimal::zero());

    let (liquidity_x, liquidity_y) =
        liquidity_from_amounts(&x_safe, &y_safe, price_sqrt, price_left_sqrt, price_right_sqrt)?;
    let liquidity = match (liquidity_x, liquidity_y) {
        (Some(x_bound), Some(y_bound)) => x_bound.min(y_bound),
        (Some(x_bound), None) => x_bound,
        (None, Some(y_bound)) => y_bound,
        (None, None) => {
            return Err(SimulationError::InvalidRange(
                "No applicable liquidity bound for the given range".to_string(),
            ))
        }
    };

    let liquidity = floor_to(&liquidity, LIQUIDITY_SCALE).min(max_liquidity.clone());
    if liquidity <= BigDecimal::zero() {
        return Err(SimulationError::InvalidRange(format!(
            "Derived liquidity must be positive, got {liquidity}"
        )));
    }

    let (x_exact, y_exact) =
        amounts_for_liquidity(&liquidity, price_sqrt, price_left_sqrt, price_right_sqrt)?;
    let x_required = ceil_to_amount(&(x_exact + atto()));
    let y_required = ceil_to_amount(&(y_exact + atto()));

    // within-margin residuals are consumed, not refunded
    let x_required = if x_amount - &x_required <= margin { x_amount.clone() } else { x_required };
    let y_required = if y_amount - &y_required <= margin { y_amount.clone() } else { y_required };

    Ok((liquidity, x_required, y_required))
}

/// Amounts released when removing `liquidity`, floored in favor of the pool,
/// plus already-settled pending fees.
pub fn remove_amounts(
    liquidity: &BigDecimal,
    price_sqrt: &BigDecimal,
    price_left_sqrt: &BigDecimal,
    price_right_sqrt: &BigDecimal,
    x_fee: &BigDecimal,
    y_fee: &BigDecimal,
) -> Result<(BigDecimal, BigDecimal), SimulationError> {
    let (x_exact, y_exact) =
        amounts_for_liquidity(liquidity, price_sqrt, price_left_sqrt, price_right_sqrt)?;
    Ok((floor_to_amount(&(x_exact + x_fee)), floor_to_amount(&(y_exact + y_fee))))
}
