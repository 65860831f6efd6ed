//! Reference simulation of a concentrated-liquidity AMM pool.
//!
//! This crate is a pure, deterministic model of how a concentrated-liquidity
//! pool transforms its price and token balances: tick↔price conversion,
//! liquidity↔amount inversion for adding and removing positions, a stepped
//! swap engine that walks price across tick boundaries, and a pro-rata fee
//! ledger. It is meant to validate a production implementation value for
//! value, so every amount is an exact-precision decimal and every rounding
//! step is explicit about its direction — no floating point anywhere in the
//! contracts.
//!
//! The engine performs no I/O and holds no global state; token custody,
//! position ownership and persistence belong to the embedding host, which
//! supplies the state each call operates on.
pub mod protocol;

pub use protocol::{
    clmm::{
        add_liquidity, remove_liquidity, swap, ClmmPool, FeeLedger, Position, PositionId,
        SwapResults, TickInfo, TickList,
    },
    errors::SimulationError,
};
