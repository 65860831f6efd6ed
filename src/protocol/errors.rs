use thiserror::Error;

use super::clmm::PositionId;

/// Errors surfaced by the simulation core.
///
/// Only true domain errors are represented here. Capacity clamping of derived
/// liquidity and skipping zero-liquidity price segments during a swap are
/// specified behaviors of the engine, not failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The position range is empty, out of tick bounds, or yields no liquidity.
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    /// A non-positive price was supplied where a positive one is required.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    /// A fee rate outside its configured cap.
    #[error("Invalid fee rate: {0}")]
    InvalidFeeRate(String),
    /// The referenced position does not exist in the pool state.
    #[error("Unknown position: {0}")]
    UnknownPosition(PositionId),
    /// An arithmetic impossibility, e.g. division by zero.
    #[error("Fatal error: {0}")]
    FatalError(String),
}
