//! Per-position fee accrual and claiming.
use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::{tick_math::tick_to_price_sqrt, Position, PositionId};
use crate::protocol::{decimal::floor_to_amount, errors::SimulationError, safe_math::safe_div};

/// Accrued trading fees: pool-wide protocol balances plus per-position LP
/// balances, keyed by position id. Absent entries are zero by construction.
///
/// Ledgers combine additively and associatively, so accruals from several
/// swaps sum correctly regardless of call order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeLedger {
    fee_protocol_x: BigDecimal,
    fee_protocol_y: BigDecimal,
    fee_lp_x: BTreeMap<PositionId, BigDecimal>,
    fee_lp_y: BTreeMap<PositionId, BigDecimal>,
}

/// A position participates in a fee contribution when its range straddles
/// the midpoint of the traversed sqrt-price interval.
fn position_is_active(
    position: &Position,
    price_a_sqrt: &BigDecimal,
    price_b_sqrt: &BigDecimal,
) -> Result<bool, SimulationError> {
    let price_left_sqrt = tick_to_price_sqrt(position.left_tick)?;
    let price_right_sqrt = tick_to_price_sqrt(position.right_tick)?;
    let midpoint = (price_a_sqrt + price_b_sqrt) / BigDecimal::from(2);
    Ok(price_left_sqrt <= midpoint && midpoint <= price_right_sqrt)
}

impl FeeLedger {
    /// Accrues one step's fee contribution. The protocol amount goes to the
    /// pool-wide balance of the input token; the LP amount splits across the
    /// positions active over the traversed interval, in exact proportion to
    /// their share of the active set's liquidity. Fractional residue from
    /// the division stays unaccounted until claim time. With no active
    /// position the LP amount is dropped, matching the zero-liquidity gap
    /// behavior of the swap engine.
    pub fn add_fees(
        &mut self,
        positions: &[Position],
        price_a_sqrt: &BigDecimal,
        price_b_sqrt: &BigDecimal,
        protocol_in: &BigDecimal,
        lp_in: &BigDecimal,
        input_is_x: bool,
    ) -> Result<(), SimulationError> {
        if input_is_x {
            self.fee_protocol_x += protocol_in;
        } else {
            self.fee_protocol_y += protocol_in;
        }

        let mut active: Vec<(PositionId, &BigDecimal)> = Vec::new();
        let mut total_liquidity = BigDecimal::zero();
        for position in positions {
            if position_is_active(position, price_a_sqrt, price_b_sqrt)? {
                active.push((position.id, &position.liquidity));
                total_liquidity += &position.liquidity;
            }
        }
        if active.is_empty() {
            return Ok(());
        }

        for (id, liquidity) in active {
            let share = safe_div(liquidity, &total_liquidity)? * lp_in;
            let balances = if input_is_x { &mut self.fee_lp_x } else { &mut self.fee_lp_y };
            *balances.entry(id).or_insert_with(BigDecimal::zero) += share;
        }
        Ok(())
    }

    /// Settles a position's accrued fees at atto granularity and zeroes its
    /// entry. A repeated claim with no intervening accrual returns zero;
    /// sub-atto residue is forfeited at claim time.
    pub fn claim_fee(&mut self, position_id: PositionId) -> (BigDecimal, BigDecimal) {
        let x_claimed = match self.fee_lp_x.get_mut(&position_id) {
            Some(balance) => {
                let settled = floor_to_amount(balance);
                *balance = BigDecimal::zero();
                settled
            }
            None => BigDecimal::zero(),
        };
        let y_claimed = match self.fee_lp_y.get_mut(&position_id) {
            Some(balance) => {
                let settled = floor_to_amount(balance);
                *balance = BigDecimal::zero();
                settled
            }
            None => BigDecimal::zero(),
        };
        (x_claimed, y_claimed)
    }

    /// Drops a position's ledger entries entirely; used when the position is
    /// removed after its fees are drained.
    pub fn remove_position(&mut self, position_id: PositionId) {
        self.fee_lp_x.remove(&position_id);
        self.fee_lp_y.remove(&position_id);
    }

    /// Unsettled accrual of one position, zero when absent.
    pub fn accrued(&self, position_id: PositionId) -> (BigDecimal, BigDecimal) {
        (
            self.fee_lp_x
                .get(&position_id)
                .cloned()
                .unwrap_or_else(BigDecimal::zero),
            self.fee_lp_y
                .get(&position_id)
                .cloned()
                .unwrap_or_else(BigDecimal::zero),
        )
    }

    pub fn protocol_fees(&self) -> (&BigDecimal, &BigDecimal) {
        (&self.fee_protocol_x, &self.fee_protocol_y)
    }

    /// Sum of all unsettled LP balances per token.
    pub fn total_lp_fees(&self) -> (BigDecimal, BigDecimal) {
        let mut x_total = BigDecimal::zero();
        for balance in self.fee_lp_x.values() {
            x_total += balance;
        }
        let mut y_total = BigDecimal::zero();
        for balance in self.fee_lp_y.values() {
            y_total += balance;
        }
        (x_total, y_total)
    }

    /// Field-by-field sum of two ledger snapshots.
    pub fn combine(a: &FeeLedger, b: &FeeLedger) -> FeeLedger {
        let mut combined = a.clone();
        combined.fee_protocol_x += &b.fee_protocol_x;
        combined.fee_protocol_y += &b.fee_protocol_y;
        for (id, balance) in &b.fee_lp_x {
            *combined
                .fee_lp_x
                .entry(*id)
                .or_insert_with(BigDecimal::zero) += balance;
        }
        for (id, balance) in &b.fee_lp_y {
            *combined
                .fee_lp_y
                .entry(*id)
                .or_insert_with(BigDecimal::zero) += balance;
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn straddling_positions() -> Vec<Position> {
        vec![
            Position::new(0, dec("1"), -100, 100).unwrap(),
            Position::new(1, dec("3"), -50, 150).unwrap(),
        ]
    }

    fn accrue(ledger: &mut FeeLedger, positions: &[Position], lp_in: &str, input_is_x: bool) {
        ledger
            .add_fees(
                positions,
                &dec("1"),
                &dec("1.0001"),
                &BigDecimal::zero(),
                &dec(lp_in),
                input_is_x,
            )
            .unwrap();
    }

    #[test]
    fn test_add_fees_splits_pro_rata() {
        let positions = straddling_positions();
        let mut ledger = FeeLedger::default();
        accrue(&mut ledger, &positions, "4", false);

        let (_, y_first) = ledger.accrued(0);
        let (_, y_second) = ledger.accrued(1);
        assert_eq!(y_first, dec("1"));
        assert_eq!(y_second, dec("3"));
    }

    #[test]
    fn test_add_fees_routes_by_input_token() {
        let positions = straddling_positions();
        let mut ledger = FeeLedger::default();
        ledger
            .add_fees(&positions, &dec("1"), &dec("0.9999"), &dec("0.5"), &dec("4"), true)
            .unwrap();

        let (x_first, y_first) = ledger.accrued(0);
        assert_eq!(x_first, dec("1"));
        assert!(y_first.is_zero());
        assert_eq!(ledger.protocol_fees(), (&dec("0.5"), &BigDecimal::zero()));
    }

    #[test]
    fn test_add_fees_skips_non_straddling_positions() {
        let positions = vec![
            Position::new(0, dec("1"), -100, 100).unwrap(),
            Position::new(1, dec("9"), 5000, 6000).unwrap(),
        ];
        let mut ledger = FeeLedger::default();
        accrue(&mut ledger, &positions, "4", false);

        let (_, y_outside) = ledger.accrued(1);
        assert!(y_outside.is_zero());
        let (_, y_inside) = ledger.accrued(0);
        assert_eq!(y_inside, dec("4"));
    }

    #[test]
    fn test_add_fees_without_active_positions_drops_lp_amount() {
        let positions = vec![Position::new(0, dec("1"), 5000, 6000).unwrap()];
        let mut ledger = FeeLedger::default();
        accrue(&mut ledger, &positions, "4", false);

        assert_eq!(ledger.total_lp_fees(), (BigDecimal::zero(), BigDecimal::zero()));
    }

    #[test]
    fn test_claim_settles_at_atto_granularity() {
        let positions = vec![Position::new(0, dec("1"), -100, 100).unwrap()];
        let mut ledger = FeeLedger::default();
        accrue(&mut ledger, &positions, "1.0000000000000000015", false);

        let (x_claimed, y_claimed) = ledger.claim_fee(0);
        assert!(x_claimed.is_zero());
        assert_eq!(y_claimed, dec("1.000000000000000001"));
    }

    #[test]
    fn test_claim_is_idempotent_until_new_accrual() {
        let positions = straddling_positions();
        let mut ledger = FeeLedger::default();
        accrue(&mut ledger, &positions, "4", false);

        let first = ledger.claim_fee(0);
        assert_eq!(first, (BigDecimal::zero(), dec("1")));
        let second = ledger.claim_fee(0);
        assert_eq!(second, (BigDecimal::zero(), BigDecimal::zero()));

        accrue(&mut ledger, &positions, "4", false);
        let third = ledger.claim_fee(0);
        assert_eq!(third, (BigDecimal::zero(), dec("1")));
    }

    #[test]
    fn test_claim_unknown_position_is_zero() {
        let mut ledger = FeeLedger::default();
        assert_eq!(ledger.claim_fee(42), (BigDecimal::zero(), BigDecimal::zero()));
    }

    #[test]
    fn test_combine_is_additive_and_associative() {
        let positions = straddling_positions();
        let mut a = FeeLedger::default();
        accrue(&mut a, &positions, "4", false);
        let mut b = FeeLedger::default();
        accrue(&mut b, &positions, "8", true);
        let mut c = FeeLedger::default();
        accrue(&mut c, &positions, "2", false);

        let left = FeeLedger::combine(&FeeLedger::combine(&a, &b), &c);
        let right = FeeLedger::combine(&a, &FeeLedger::combine(&b, &c));
        assert_eq!(left, right);

        let (_, y_first) = left.accrued(0);
        assert_eq!(y_first, dec("1.5"));
        let (x_second, _) = left.accrued(1);
        assert_eq!(x_second, dec("6"));
    }
}
