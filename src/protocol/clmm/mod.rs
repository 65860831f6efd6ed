//! Concentrated-liquidity pool model: tick price conversion, the tick
//! liquidity map, position sizing, the stepped swap engine and the fee
//! ledger.
pub mod fees;
pub mod liquidity_math;
pub mod state;
pub mod swap_math;
pub mod tick_list;
pub mod tick_math;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use self::tick_math::{MAX_TICK, MIN_TICK};
use crate::protocol::errors::SimulationError;

pub use self::{
    fees::FeeLedger,
    state::{add_liquidity, remove_liquidity, swap, ClmmPool, SwapResults},
    tick_list::{TickInfo, TickList},
};

/// Identifier assigned to a position by the state holder; the fee ledger is
/// keyed by it.
pub type PositionId = u64;

/// A claim on the price range `[left_tick, right_tick)`.
///
/// A position owns no tokens; the amounts backing it are derived from its
/// liquidity and the current price whenever they are needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub liquidity: BigDecimal,
    pub left_tick: i32,
    pub right_tick: i32,
}

impl Position {
    pub fn new(
        id: PositionId,
        liquidity: BigDecimal,
        left_tick: i32,
        right_tick: i32,
    ) -> Result<Self, SimulationError> {
        if left_tick >= right_tick {
            return Err(SimulationError::InvalidRange(format!(
                "Left bound {left_tick} must be below right bound {right_tick}"
            )));
        }
        if left_tick < MIN_TICK || right_tick > MAX_TICK {
            return Err(SimulationError::InvalidRange(format!(
                "Bounds [{left_tick}, {right_tick}] outside [{MIN_TICK}, {MAX_TICK}]"
            )));
        }
        if liquidity <= BigDecimal::zero() {
            return Err(SimulationError::InvalidRange(format!(
                "Liquidity must be positive, got {liquidity}"
            )));
        }
        Ok(Position { id, liquidity, left_tick, right_tick })
    }
}
