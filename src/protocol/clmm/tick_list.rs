//! Ordered map of net liquidity deltas at initialized tick boundaries.
use std::collections::{btree_map::Entry, BTreeMap};

use bigdecimal::BigDecimal;
use num_traits::Zero;

use super::{tick_math::tick_to_price_sqrt, Position};
use crate::protocol::errors::SimulationError;

/// Net liquidity change at one initialized tick, with its sqrt-price
/// precomputed at insertion time.
#[derive(Clone, Debug, PartialEq)]
pub struct TickInfo {
    pub net_liquidity: BigDecimal,
    pub price_sqrt: BigDecimal,
}

/// Tick boundaries keyed by index. Tick order equals price order, so
/// in-order traversal doubles as a price-sorted frontier.
///
/// The map is built by adding `+L` at each position's left tick and `-L` at
/// its right tick; across any well-formed position set the deltas sum to
/// exactly zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickList {
    ticks: BTreeMap<i32, TickInfo>,
}

impl TickList {
    pub fn from_positions(positions: &[Position]) -> Result<Self, SimulationError> {
        let mut list = TickList::default();
        for position in positions {
            list.apply_liquidity_delta(position.left_tick, &position.liquidity)?;
            list.apply_liquidity_delta(position.right_tick, &-&position.liquidity)?;
        }
        Ok(list)
    }

    /// Adds `delta` to the net liquidity at `tick`, inserting the boundary if
    /// it was not initialized and dropping it when its net returns to zero.
    pub fn apply_liquidity_delta(
        &mut self,
        tick: i32,
        delta: &BigDecimal,
    ) -> Result<(), SimulationError> {
        match self.ticks.entry(tick) {
            Entry::Vacant(entry) => {
                if !delta.is_zero() {
                    entry.insert(TickInfo {
                        net_liquidity: delta.clone(),
                        price_sqrt: tick_to_price_sqrt(tick)?,
                    });
                }
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().net_liquidity += delta;
                if entry.get().net_liquidity.is_zero() {
                    entry.remove();
                }
            }
        }
        Ok(())
    }

    pub fn get_tick(&self, tick: i32) -> Option<&TickInfo> {
        self.ticks.get(&tick)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Sum of all net deltas; exactly zero for any well-formed position set.
    pub fn net_liquidity_sum(&self) -> BigDecimal {
        let mut total = BigDecimal::zero();
        for info in self.ticks.values() {
            total += &info.net_liquidity;
        }
        total
    }

    /// Active liquidity at `price_sqrt`: the running delta sum over ticks
    /// strictly below the price when the input token is X (price moving
    /// down), at-or-below when the input token is Y (price moving up). The
    /// asymmetry makes a position active exactly when its range straddles the
    /// current price in the trade direction.
    pub fn active_liquidity(&self, price_sqrt: &BigDecimal, input_is_x: bool) -> BigDecimal {
        let mut total = BigDecimal::zero();
        for info in self.ticks.values() {
            let counted = if input_is_x {
                info.price_sqrt < *price_sqrt
            } else {
                info.price_sqrt <= *price_sqrt
            };
            if counted {
                total += &info.net_liquidity;
            }
        }
        total
    }

    /// Boundaries at or below `price_sqrt`, nearest first: the frontier a
    /// sell (X input) walks as price moves down.
    pub fn ticks_below(&self, price_sqrt: &BigDecimal) -> Vec<(i32, BigDecimal)> {
        self.ticks
            .iter()
            .filter(|(_, info)| info.price_sqrt <= *price_sqrt)
            .map(|(tick, info)| (*tick, info.price_sqrt.clone()))
            .rev()
            .collect()
    }

    /// Boundaries strictly above `price_sqrt`, nearest first: the frontier a
    /// buy (Y input) walks as price moves up.
    pub fn ticks_above(&self, price_sqrt: &BigDecimal) -> Vec<(i32, BigDecimal)> {
        self.ticks
            .iter()
            .filter(|(_, info)| *price_sqrt < info.price_sqrt)
            .map(|(tick, info)| (*tick, info.price_sqrt.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use num_traits::One;

    use super::*;

    fn positions() -> Vec<Position> {
        vec![
            Position::new(0, BigDecimal::from(100), -100, 100).unwrap(),
            Position::new(1, BigDecimal::from(40), -100, 50).unwrap(),
        ]
    }

    #[test]
    fn test_from_positions_nets_deltas() {
        let list = TickList::from_positions(&positions()).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get_tick(-100).unwrap().net_liquidity, BigDecimal::from(140));
        assert_eq!(list.get_tick(50).unwrap().net_liquidity, BigDecimal::from(-40));
        assert_eq!(list.get_tick(100).unwrap().net_liquidity, BigDecimal::from(-100));
        assert!(list.net_liquidity_sum().is_zero());
    }

    #[test]
    fn test_apply_delta_drops_empty_ticks() {
        let mut list = TickList::from_positions(&positions()).unwrap();
        list.apply_liquidity_delta(50, &BigDecimal::from(40))
            .unwrap();
        assert!(list.get_tick(50).is_none());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_active_liquidity_between_bounds() {
        let list = TickList::from_positions(&positions()).unwrap();
        // tick 0 price is exactly 1
        let price_sqrt = BigDecimal::one();
        assert_eq!(list.active_liquidity(&price_sqrt, true), BigDecimal::from(140));
        assert_eq!(list.active_liquidity(&price_sqrt, false), BigDecimal::from(140));
    }

    #[test]
    fn test_active_liquidity_boundary_inclusivity() {
        let single = vec![Position::new(0, BigDecimal::from(5), 0, 100).unwrap()];
        let list = TickList::from_positions(&single).unwrap();
        let price_sqrt = BigDecimal::one();
        // at the left bound the delta counts only in the upward direction
        assert_eq!(list.active_liquidity(&price_sqrt, true), BigDecimal::zero());
        assert_eq!(list.active_liquidity(&price_sqrt, false), BigDecimal::from(5));
    }

    #[test]
    fn test_frontiers_are_price_ordered() {
        let list = TickList::from_positions(&positions()).unwrap();
        let price_sqrt = BigDecimal::one();

        let below: Vec<i32> = list
            .ticks_below(&price_sqrt)
            .into_iter()
            .map(|(tick, _)| tick)
            .collect();
        assert_eq!(below, vec![-100]);

        let above: Vec<i32> = list
            .ticks_above(&price_sqrt)
            .into_iter()
            .map(|(tick, _)| tick)
            .collect();
        assert_eq!(above, vec![50, 100]);
    }

    #[test]
    fn test_frontier_includes_boundary_at_price_for_sell_only() {
        let single = vec![Position::new(0, BigDecimal::from(5), 0, 100).unwrap()];
        let list = TickList::from_positions(&single).unwrap();
        let price_sqrt = BigDecimal::one();
        assert_eq!(list.ticks_below(&price_sqrt).len(), 1);
        let above: Vec<i32> = list
            .ticks_above(&price_sqrt)
            .into_iter()
            .map(|(tick, _)| tick)
            .collect();
        assert_eq!(above, vec![100]);
    }
}
