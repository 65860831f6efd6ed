//! The swap engine and the pool state holder.
//!
//! The entry points here are pure: every call receives the position set and
//! price it operates on and returns the transformed values, leaving all
//! ownership, custody and persistence to the embedding host. [`ClmmPool`]
//! bundles those calls over an in-memory snapshot for callers that want the
//! pool's state mutated in lockstep.
use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use tracing::{debug, trace};

use super::{
    fees::FeeLedger,
    liquidity_math::{allowed_amounts, remove_amounts},
    swap_math::{
        gross_up_input, input_in_step, next_price_sqrt, output_in_step, split_fee,
        validate_fee_rates,
    },
    tick_list::TickList,
    tick_math::{align_tick, max_liquidity_per_tick, price_to_tick, tick_to_price_sqrt},
    Position, PositionId,
};
use crate::protocol::{errors::SimulationError, safe_math::safe_sqrt};

/// Outcome of one swap call.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapResults {
    /// Sqrt-price after the swap.
    pub price_sqrt: BigDecimal,
    /// Output amount owed to the trader, atto-floored per step.
    pub output: BigDecimal,
    /// Input left unconsumed because no boundary remained ahead.
    pub remainder: BigDecimal,
    /// Gross input actually consumed, `input_amount - remainder`.
    pub input_consumed: BigDecimal,
    /// Fee accruals of this call only; combine into the pool ledger.
    pub fees: FeeLedger,
}

fn check_price_sqrt(price_sqrt: &BigDecimal) -> Result<(), SimulationError> {
    if price_sqrt <= &BigDecimal::zero() {
        return Err(SimulationError::InvalidPrice(format!(
            "Sqrt-price must be positive, got {price_sqrt}"
        )));
    }
    Ok(())
}

fn check_amount(name: &str, amount: &BigDecimal) -> Result<(), SimulationError> {
    if amount < &BigDecimal::zero() {
        return Err(SimulationError::InvalidRange(format!(
            "{name} must not be negative, got {amount}"
        )));
    }
    Ok(())
}

/// Sizes an add-liquidity call over `[left_tick, right_tick)` at the given
/// sqrt-price: returns `(liquidity, required_x, required_y)` where the
/// required amounts never exceed the requested ones. The caller updates its
/// tick map with the returned liquidity; no tokens move here.
pub fn add_liquidity(
    price_sqrt: &BigDecimal,
    left_tick: i32,
    right_tick: i32,
    requested_x: &BigDecimal,
    requested_y: &BigDecimal,
    max_liquidity: &BigDecimal,
) -> Result<(BigDecimal, BigDecimal, BigDecimal), SimulationError> {
    check_price_sqrt(price_sqrt)?;
    check_amount("Requested X", requested_x)?;
    check_amount("Requested Y", requested_y)?;
    if left_tick >= right_tick {
        return Err(SimulationError::InvalidRange(format!(
            "Left bound {left_tick} must be below right bound {right_tick}"
        )));
    }
    let price_left_sqrt = tick_to_price_sqrt(left_tick)?;
    let price_right_sqrt = tick_to_price_sqrt(right_tick)?;
    let (liquidity, x_required, y_required) = allowed_amounts(
        requested_x,
        requested_y,
        price_sqrt,
        &price_left_sqrt,
        &price_right_sqrt,
        max_liquidity,
    )?;
    debug!(%liquidity, %x_required, %y_required, left_tick, right_tick, "add liquidity");
    Ok((liquidity, x_required, y_required))
}

/// Amounts released by removing `liquidity` from `[left_tick, right_tick)`,
/// plus already-settled pending fees. Pure inversion; mutating the tick map
/// and ledger is the caller's responsibility.
pub fn remove_liquidity(
    liquidity: &BigDecimal,
    price_sqrt: &BigDecimal,
    left_tick: i32,
    right_tick: i32,
    fee_x: &BigDecimal,
    fee_y: &BigDecimal,
) -> Result<(BigDecimal, BigDecimal), SimulationError> {
    check_price_sqrt(price_sqrt)?;
    if left_tick >= right_tick {
        return Err(SimulationError::InvalidRange(format!(
            "Left bound {left_tick} must be below right bound {right_tick}"
        )));
    }
    if liquidity <= &BigDecimal::zero() {
        return Err(SimulationError::InvalidRange(format!(
            "Liquidity must be positive, got {liquidity}"
        )));
    }
    let price_left_sqrt = tick_to_price_sqrt(left_tick)?;
    let price_right_sqrt = tick_to_price_sqrt(right_tick)?;
    let (x_returned, y_returned) = remove_amounts(
        liquidity,
        price_sqrt,
        &price_left_sqrt,
        &price_right_sqrt,
        fee_x,
        fee_y,
    )?;
    debug!(%liquidity, %x_returned, %y_returned, left_tick, right_tick, "remove liquidity");
    Ok((x_returned, y_returned))
}

/// Executes a swap against the given position set.
///
/// The engine walks the price-sorted frontier of tick boundaries ahead of
/// the current price. Each boundary is either skipped (zero active
/// liquidity), fully consumed (price lands exactly on the boundary and the
/// fee-inclusive step input is deducted from the remainder) or partially
/// consumed (the closed-form candidate price stays inside the range, the
/// remainder is exhausted and the walk terminates). Input left over once the
/// frontier is exhausted comes back as `remainder` rather than an error.
pub fn swap(
    positions: &[Position],
    price_sqrt: &BigDecimal,
    input_amount: &BigDecimal,
    input_is_x: bool,
    fee_rate: &BigDecimal,
    protocol_share: &BigDecimal,
) -> Result<SwapResults, SimulationError> {
    check_price_sqrt(price_sqrt)?;
    check_amount("Input amount", input_amount)?;
    validate_fee_rates(fee_rate, protocol_share)?;

    let mut fees = FeeLedger::default();
    if input_amount.is_zero() {
        return Ok(SwapResults {
            price_sqrt: price_sqrt.clone(),
            output: BigDecimal::zero(),
            remainder: BigDecimal::zero(),
            input_consumed: BigDecimal::zero(),
            fees,
        });
    }

    let ticks = TickList::from_positions(positions)?;
    let frontier =
        if input_is_x { ticks.ticks_below(price_sqrt) } else { ticks.ticks_above(price_sqrt) };

    let mut price = price_sqrt.clone();
    let mut output = BigDecimal::zero();
    let mut remaining = input_amount.clone();

    for (next_tick, price_next_sqrt) in frontier {
        let active_liquidity = ticks.active_liquidity(&price, input_is_x);
        trace!(next_tick, %active_liquidity, %remaining, "swap step");

        if active_liquidity.is_zero() {
            // liquidity gap: price crosses for free, no output, no fee
            price = price_next_sqrt;
            continue;
        }

        let (input_net, fee_lp, fee_protocol) = split_fee(&remaining, fee_rate, protocol_share);
        let price_new_sqrt = next_price_sqrt(&active_liquidity, &price, &input_net, input_is_x)?;

        let reaches_boundary = if input_is_x {
            price_new_sqrt <= price_next_sqrt
        } else {
            price_next_sqrt <= price_new_sqrt
        };

        if !reaches_boundary {
            output += output_in_step(&active_liquidity, &price, &price_new_sqrt, input_is_x)?;
            fees.add_fees(positions, &price, &price_new_sqrt, &fee_protocol, &fee_lp, input_is_x)?;
            remaining = BigDecimal::zero();
            price = price_new_sqrt;
            break;
        }

        output += output_in_step(&active_liquidity, &price, &price_next_sqrt, input_is_x)?;
        let input_net_step = input_in_step(&active_liquidity, &price, &price_next_sqrt, input_is_x)?;
        let input_step_with_fee = gross_up_input(&input_net_step, fee_rate)?;
        let (_, step_fee_lp, step_fee_protocol) =
            split_fee(&input_step_with_fee, fee_rate, protocol_share);
        fees.add_fees(positions, &price, &price_next_sqrt, &step_fee_protocol, &step_fee_lp, input_is_x)?;
        remaining -= input_step_with_fee;
        price = price_next_sqrt;

        if remaining <= BigDecimal::zero() {
            break;
        }
    }

    // ceiling the per-step input can nudge the consumed total past the
    // provided amount by sub-atto dust; never report a negative remainder
    let remainder = remaining.max(BigDecimal::zero());
    let input_consumed = input_amount - &remainder;
    debug!(%output, %remainder, price_sqrt = %price, "swap complete");

    Ok(SwapResults { price_sqrt: price, output, remainder, input_consumed, fees })
}

/// In-memory pool state: current sqrt-price, fee configuration, the open
/// positions and the fee ledger, mutated in lockstep by every
/// add/remove/swap/claim call.
#[derive(Clone, Debug)]
pub struct ClmmPool {
    price_sqrt: BigDecimal,
    input_fee_rate: BigDecimal,
    fee_protocol_share: BigDecimal,
    tick_spacing: u32,
    max_liquidity_per_tick: BigDecimal,
    positions: BTreeMap<PositionId, Position>,
    next_position_id: PositionId,
    fees: FeeLedger,
}

impl ClmmPool {
    /// Creates a pool at the given spot price.
    pub fn new(
        price: &BigDecimal,
        input_fee_rate: &BigDecimal,
        fee_protocol_share: &BigDecimal,
        tick_spacing: u32,
    ) -> Result<Self, SimulationError> {
        if price <= &BigDecimal::zero() {
            return Err(SimulationError::InvalidPrice(format!(
                "Price must be positive, got {price}"
            )));
        }
        validate_fee_rates(input_fee_rate, fee_protocol_share)?;
        Ok(ClmmPool {
            price_sqrt: safe_sqrt(price)?,
            input_fee_rate: input_fee_rate.clone(),
            fee_protocol_share: fee_protocol_share.clone(),
            tick_spacing,
            max_liquidity_per_tick: max_liquidity_per_tick(tick_spacing)?,
            positions: BTreeMap::new(),
            next_position_id: 0,
            fees: FeeLedger::default(),
        })
    }

    fn check_alignment(&self, tick: i32) -> Result<(), SimulationError> {
        if align_tick(tick, self.tick_spacing)? != tick {
            return Err(SimulationError::InvalidRange(format!(
                "Tick {tick} not aligned to spacing {}",
                self.tick_spacing
            )));
        }
        Ok(())
    }

    /// Opens a position; returns its id, the granted liquidity and the
    /// amounts the caller must supply.
    pub fn add_liquidity(
        &mut self,
        left_tick: i32,
        right_tick: i32,
        requested_x: &BigDecimal,
        requested_y: &BigDecimal,
    ) -> Result<(PositionId, BigDecimal, BigDecimal, BigDecimal), SimulationError> {
        self.check_alignment(left_tick)?;
        self.check_alignment(right_tick)?;
        let (liquidity, x_required, y_required) = add_liquidity(
            &self.price_sqrt,
            left_tick,
            right_tick,
            requested_x,
            requested_y,
            &self.max_liquidity_per_tick,
        )?;
        let id = self.next_position_id;
        self.next_position_id += 1;
        self.positions
            .insert(id, Position::new(id, liquidity.clone(), left_tick, right_tick)?);
        Ok((id, liquidity, x_required, y_required))
    }

    /// Closes a position, draining its settled fees into the returned
    /// amounts.
    pub fn remove_liquidity(
        &mut self,
        position_id: PositionId,
    ) -> Result<(BigDecimal, BigDecimal), SimulationError> {
        let position = self
            .positions
            .remove(&position_id)
            .ok_or(SimulationError::UnknownPosition(position_id))?;
        let (fee_x, fee_y) = self.fees.claim_fee(position_id);
        self.fees.remove_position(position_id);
        remove_liquidity(
            &position.liquidity,
            &self.price_sqrt,
            position.left_tick,
            position.right_tick,
            &fee_x,
            &fee_y,
        )
    }

    /// Executes a swap, advances the pool price and folds the call's fee
    /// accruals into the pool ledger.
    pub fn swap(
        &mut self,
        input_amount: &BigDecimal,
        input_is_x: bool,
    ) -> Result<SwapResults, SimulationError> {
        let positions: Vec<Position> = self.positions.values().cloned().collect();
        let results = swap(
            &positions,
            &self.price_sqrt,
            input_amount,
            input_is_x,
            &self.input_fee_rate,
            &self.fee_protocol_share,
        )?;
        self.price_sqrt = results.price_sqrt.clone();
        self.fees = FeeLedger::combine(&self.fees, &results.fees);
        Ok(results)
    }

    /// Settles a position's accrued fees; a repeated claim yields zero.
    pub fn claim_fee(
        &mut self,
        position_id: PositionId,
    ) -> Result<(BigDecimal, BigDecimal), SimulationError> {
        if !self.positions.contains_key(&position_id) {
            return Err(SimulationError::UnknownPosition(position_id));
        }
        Ok(self.fees.claim_fee(position_id))
    }

    pub fn price_sqrt(&self) -> &BigDecimal {
        &self.price_sqrt
    }

    pub fn spot_price(&self) -> BigDecimal {
        &self.price_sqrt * &self.price_sqrt
    }

    /// The tick the current price sits in, derived from the price.
    pub fn active_tick(&self) -> Result<i32, SimulationError> {
        price_to_tick(&self.spot_price())
    }

    pub fn input_fee_rate(&self) -> &BigDecimal {
        &self.input_fee_rate
    }

    pub fn fee_protocol_share(&self) -> &BigDecimal {
        &self.fee_protocol_share
    }

    pub fn tick_spacing(&self) -> u32 {
        self.tick_spacing
    }

    pub fn position(&self, position_id: PositionId) -> Option<&Position> {
        self.positions.get(&position_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn fees(&self) -> &FeeLedger {
        &self.fees
    }

    /// Total liquidity across all open positions.
    pub fn total_liquidity(&self) -> BigDecimal {
        let mut total = BigDecimal::zero();
        for position in self.positions.values() {
            total += &position.liquidity;
        }
        total
    }
}
