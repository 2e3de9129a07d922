//! The ledger: capital, the single open position, trade history, equity curve.

use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};

use super::cost::CostModel;
use super::summary::LedgerSummary;
use crate::domain::{
    Action, EquityPoint, ExitReason, Position, PositionId, PositionSide, StopSource, Trade,
};

/// Remaining size below this fraction of the original counts as fully closed.
const DUST_FRACTION: f64 = 1e-9;

/// Why an execution request did not change the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    InvalidPrice,
    InvalidSize,
    PositionAlreadyOpen,
    NoPosition,
}

/// Outcome classification of an execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionReason {
    NoAction,
    Opened,
    Closed,
    Reduced,
    Rejected(Rejection),
}

/// Result of `Ledger::execute`, `reduce`, `close` and `close_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub executed: bool,
    pub reason: ExecutionReason,
}

impl ExecutionResult {
    pub fn no_action() -> Self {
        Self {
            executed: false,
            reason: ExecutionReason::NoAction,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            executed: false,
            reason: ExecutionReason::Rejected(rejection),
        }
    }

    /// A confirmed full close, such as the closing leg of a reversal.
    pub fn closed() -> Self {
        Self::done(ExecutionReason::Closed)
    }

    fn done(reason: ExecutionReason) -> Self {
        Self {
            executed: true,
            reason,
        }
    }
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Single-instrument ledger.
///
/// Owns at most one open `Position`. Capital is the realized account value:
/// initial capital plus realized PnL minus every commission charged. Capital
/// is not required to stay non-negative; the first drop below zero is logged
/// and reported by `is_insolvent`.
#[derive(Debug, Clone)]
pub struct Ledger {
    instrument: String,
    initial_capital: f64,
    capital: f64,
    costs: CostModel,
    position: Option<Position>,
    next_position_id: u64,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    total_commission: f64,
    insolvency_logged: bool,
}

impl Ledger {
    pub fn new(instrument: impl Into<String>, initial_capital: f64, costs: CostModel) -> Self {
        Self {
            instrument: instrument.into(),
            initial_capital,
            capital: initial_capital,
            costs,
            position: None,
            next_position_id: 1,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            total_commission: 0.0,
            insolvency_logged: false,
        }
    }

    /// Apply a strategy action.
    ///
    /// - `Action::None` never changes state.
    /// - Same side as the open position: `size == 0` is a no-op, anything
    ///   else is rejected (one position per instrument).
    /// - Opposite side: close the open position (`signal-close`), then open
    ///   the new one if `size > 0`.
    pub fn execute(
        &mut self,
        action: Action,
        size: f64,
        price: f64,
        timestamp: NaiveDateTime,
    ) -> ExecutionResult {
        let Some(side) = action.side() else {
            return ExecutionResult::no_action();
        };
        if !valid_price(price) {
            return ExecutionResult::rejected(Rejection::InvalidPrice);
        }
        if !size.is_finite() || size < 0.0 {
            return ExecutionResult::rejected(Rejection::InvalidSize);
        }

        match self.position.as_ref().map(|p| p.side) {
            Some(open_side) if open_side == side => {
                if size == 0.0 {
                    ExecutionResult::no_action()
                } else {
                    ExecutionResult::rejected(Rejection::PositionAlreadyOpen)
                }
            }
            Some(_) => {
                self.close_quantity(f64::INFINITY, price, timestamp, ExitReason::SignalClose);
                if size == 0.0 {
                    ExecutionResult::done(ExecutionReason::Closed)
                } else {
                    self.open(side, size, price, timestamp);
                    ExecutionResult::done(ExecutionReason::Opened)
                }
            }
            None => {
                if size == 0.0 {
                    ExecutionResult::rejected(Rejection::InvalidSize)
                } else {
                    self.open(side, size, price, timestamp);
                    ExecutionResult::done(ExecutionReason::Opened)
                }
            }
        }
    }

    /// Close `quantity` units of the open position.
    ///
    /// Closing the whole remaining size (or more) is a full close.
    pub fn reduce(
        &mut self,
        quantity: f64,
        price: f64,
        timestamp: NaiveDateTime,
        reason: ExitReason,
    ) -> ExecutionResult {
        if self.position.is_none() {
            return ExecutionResult::rejected(Rejection::NoPosition);
        }
        if !valid_price(price) {
            return ExecutionResult::rejected(Rejection::InvalidPrice);
        }
        if !(quantity.is_finite() && quantity > 0.0) {
            return ExecutionResult::rejected(Rejection::InvalidSize);
        }
        if self.close_quantity(quantity, price, timestamp, reason) {
            ExecutionResult::done(ExecutionReason::Closed)
        } else {
            ExecutionResult::done(ExecutionReason::Reduced)
        }
    }

    /// Fully close the open position with an explicit reason.
    pub fn close(
        &mut self,
        price: f64,
        timestamp: NaiveDateTime,
        reason: ExitReason,
    ) -> ExecutionResult {
        if self.position.is_none() {
            return ExecutionResult::rejected(Rejection::NoPosition);
        }
        if !valid_price(price) {
            return ExecutionResult::rejected(Rejection::InvalidPrice);
        }
        self.close_quantity(f64::INFINITY, price, timestamp, reason);
        ExecutionResult::done(ExecutionReason::Closed)
    }

    /// Force-liquidate any open position. Idempotent when flat.
    pub fn close_all(&mut self, price: f64, timestamp: NaiveDateTime) -> ExecutionResult {
        if self.position.is_none() {
            return ExecutionResult::no_action();
        }
        self.close(price, timestamp, ExitReason::ForcedLiquidation)
    }

    /// Mark the open position and append exactly one equity point.
    ///
    /// An invalid price carries the previous unrealized PnL forward.
    pub fn update_equity(&mut self, price: f64, timestamp: NaiveDateTime) -> &EquityPoint {
        let unrealized = match self.position.as_mut() {
            Some(pos) => {
                if valid_price(price) {
                    pos.mark(price);
                }
                pos.unrealized_pnl
            }
            None => 0.0,
        };
        self.equity_curve.push(EquityPoint {
            timestamp,
            capital: self.capital,
            unrealized_pnl: unrealized,
            equity: self.capital + unrealized,
        });
        &self.equity_curve[self.equity_curve.len() - 1]
    }

    /// Ratchet the open position's stop. Returns true if the stop moved.
    pub fn tighten_stop(&mut self, proposed: f64, source: StopSource) -> bool {
        match self.position.as_mut() {
            Some(pos) => pos.tighten_stop(proposed, source),
            None => false,
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary::compute(
            &self.trades,
            self.initial_capital,
            self.capital,
            self.total_commission,
        )
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn is_insolvent(&self) -> bool {
        self.capital < 0.0
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Consume the ledger, returning its trade history and equity curve.
    pub fn into_history(self) -> (Vec<Trade>, Vec<EquityPoint>) {
        (self.trades, self.equity_curve)
    }

    fn open(&mut self, side: PositionSide, size: f64, price: f64, timestamp: NaiveDateTime) {
        let fill = self.costs.entry_fill(side, price);
        let commission = self.costs.commission(size, fill);
        self.charge(commission);

        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        self.position = Some(Position {
            id,
            instrument: self.instrument.clone(),
            side,
            size,
            original_size: size,
            entry_price: fill,
            entry_time: timestamp,
            entry_commission: commission,
            unrealized_pnl: 0.0,
            stop: None,
            stop_source: None,
        });
    }

    /// Close up to `quantity` units. Returns true if the position is now flat.
    fn close_quantity(
        &mut self,
        quantity: f64,
        price: f64,
        timestamp: NaiveDateTime,
        reason: ExitReason,
    ) -> bool {
        let Some(mut pos) = self.position.take() else {
            return true;
        };

        let full = quantity >= pos.size - pos.original_size * DUST_FRACTION;
        let qty = if full { pos.size } else { quantity };

        let fill = self.costs.exit_fill(pos.side, price);
        let pnl = pos.pnl_at(fill, qty);
        let exit_commission = self.costs.commission(qty, fill);
        let entry_share = if full {
            pos.entry_commission
        } else {
            pos.entry_commission * qty / pos.size
        };
        pos.entry_commission -= entry_share;

        self.capital += pnl;
        self.charge(exit_commission);

        let notional = pos.entry_price * qty;
        let remaining = if full { 0.0 } else { pos.size - qty };
        self.trades.push(Trade {
            instrument: pos.instrument.clone(),
            side: pos.side,
            size: qty,
            entry_price: pos.entry_price,
            entry_time: pos.entry_time,
            exit_price: fill,
            exit_time: timestamp,
            realized_pnl: pnl,
            realized_pnl_pct: if notional > 0.0 { pnl / notional * 100.0 } else { 0.0 },
            commission: exit_commission + entry_share,
            exit_reason: reason,
            is_partial: !full,
            remaining_size: remaining,
        });

        if full {
            true
        } else {
            pos.size = remaining;
            pos.mark(price);
            self.position = Some(pos);
            false
        }
    }

    fn charge(&mut self, commission: f64) {
        self.capital -= commission;
        self.total_commission += commission;
        if self.capital < 0.0 && !self.insolvency_logged {
            self.insolvency_logged = true;
            warn!(
                "{}: capital dropped below zero ({:.4}); continuing without a solvency guard",
                self.instrument, self.capital
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn frictionless() -> Ledger {
        Ledger::new("BTCUSDT", 10_000.0, CostModel::frictionless())
    }

    #[test]
    fn long_round_trip_realizes_expected_pnl() {
        let mut ledger = frictionless();
        let opened = ledger.execute(Action::Long, 0.1, 100.0, ts(1));
        assert_eq!(opened.reason, ExecutionReason::Opened);
        let closed = ledger.close(110.0, ts(2), ExitReason::SignalClose);
        assert!(closed.executed);
        let trade = &ledger.trades()[0];
        assert!((trade.realized_pnl - 1.0).abs() < 1e-9);
        assert!((ledger.capital() - 10_001.0).abs() < 1e-9);
    }

    #[test]
    fn none_action_is_no_op() {
        let mut ledger = frictionless();
        let result = ledger.execute(Action::None, 1.0, f64::NAN, ts(1));
        assert_eq!(result, ExecutionResult::no_action());
        assert!(!ledger.has_position());
    }

    #[test]
    fn invalid_inputs_are_rejected_not_raised() {
        let mut ledger = frictionless();
        assert_eq!(
            ledger.execute(Action::Long, 1.0, -5.0, ts(1)).reason,
            ExecutionReason::Rejected(Rejection::InvalidPrice)
        );
        assert_eq!(
            ledger.execute(Action::Long, f64::NAN, 100.0, ts(1)).reason,
            ExecutionReason::Rejected(Rejection::InvalidSize)
        );
        assert_eq!(
            ledger.execute(Action::Long, 0.0, 100.0, ts(1)).reason,
            ExecutionReason::Rejected(Rejection::InvalidSize)
        );
        assert!(!ledger.has_position());
        assert_eq!(ledger.capital(), 10_000.0);
    }

    #[test]
    fn same_side_zero_size_is_no_op_and_nonzero_rejected() {
        let mut ledger = frictionless();
        ledger.execute(Action::Short, 1.0, 100.0, ts(1));
        assert_eq!(
            ledger.execute(Action::Short, 0.0, 101.0, ts(2)),
            ExecutionResult::no_action()
        );
        assert_eq!(
            ledger.execute(Action::Short, 1.0, 101.0, ts(2)).reason,
            ExecutionReason::Rejected(Rejection::PositionAlreadyOpen)
        );
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn opposite_action_reverses_in_one_call() {
        let mut ledger = frictionless();
        ledger.execute(Action::Long, 1.0, 100.0, ts(1));
        let result = ledger.execute(Action::Short, 2.0, 105.0, ts(2));
        assert_eq!(result.reason, ExecutionReason::Opened);
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.trades()[0].exit_reason, ExitReason::SignalClose);
        let pos = ledger.position().unwrap();
        assert_eq!(pos.side, PositionSide::Short);
        assert_eq!(pos.size, 2.0);
        assert_eq!(pos.id, PositionId(2));
    }

    #[test]
    fn partial_close_records_remaining_size() {
        let mut ledger = frictionless();
        ledger.execute(Action::Long, 4.0, 100.0, ts(1));
        let result = ledger.reduce(1.0, 110.0, ts(2), ExitReason::PartialTarget1);
        assert_eq!(result.reason, ExecutionReason::Reduced);
        let trade = &ledger.trades()[0];
        assert!(trade.is_partial);
        assert_eq!(trade.remaining_size, 3.0);
        assert_eq!(ledger.position().unwrap().size, 3.0);
        assert_eq!(ledger.position().unwrap().original_size, 4.0);

        let result = ledger.reduce(10.0, 110.0, ts(3), ExitReason::PartialTarget2);
        assert_eq!(result.reason, ExecutionReason::Closed);
        assert!(!ledger.trades()[1].is_partial);
        assert!(!ledger.has_position());
    }

    #[test]
    fn commission_is_charged_on_open_and_close() {
        let mut ledger = Ledger::new("X", 1_000.0, CostModel::new(0.01, 0.0));
        ledger.execute(Action::Long, 1.0, 100.0, ts(1));
        assert!((ledger.capital() - 999.0).abs() < 1e-9);
        ledger.close(100.0, ts(2), ExitReason::SignalClose);
        assert!((ledger.capital() - 998.0).abs() < 1e-9);
        assert!((ledger.trades()[0].commission - 2.0).abs() < 1e-9);
        assert!(ledger.trades()[0].is_loser());
    }

    #[test]
    fn close_all_is_idempotent() {
        let mut ledger = frictionless();
        assert_eq!(ledger.close_all(100.0, ts(1)), ExecutionResult::no_action());
        ledger.execute(Action::Long, 1.0, 100.0, ts(1));
        assert!(ledger.close_all(90.0, ts(2)).executed);
        assert_eq!(ledger.close_all(90.0, ts(3)), ExecutionResult::no_action());
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.trades()[0].exit_reason, ExitReason::ForcedLiquidation);
    }

    #[test]
    fn update_equity_appends_one_point_per_call() {
        let mut ledger = frictionless();
        ledger.update_equity(100.0, ts(1));
        ledger.execute(Action::Long, 2.0, 100.0, ts(2));
        let point = ledger.update_equity(103.0, ts(2)).clone();
        assert_eq!(point.unrealized_pnl, 6.0);
        assert_eq!(point.equity, 10_006.0);
        let carried = ledger.update_equity(f64::NAN, ts(3)).clone();
        assert_eq!(carried.unrealized_pnl, 6.0);
        assert_eq!(ledger.equity_curve().len(), 3);
    }

    #[test]
    fn capital_may_go_negative() {
        let mut ledger = Ledger::new("X", 10.0, CostModel::frictionless());
        ledger.execute(Action::Long, 1.0, 100.0, ts(1));
        ledger.close(50.0, ts(2), ExitReason::StopHit);
        assert!(ledger.is_insolvent());
        assert!((ledger.capital() + 40.0).abs() < 1e-9);
    }

    #[test]
    fn summary_reports_unbounded_profit_factor_without_losses() {
        let mut ledger = frictionless();
        ledger.execute(Action::Long, 1.0, 100.0, ts(1));
        ledger.close(110.0, ts(2), ExitReason::SignalClose);
        let summary = ledger.summary();
        assert_eq!(summary.num_trades, 1);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.profit_factor, super::super::ProfitFactor::Unbounded);
        assert!((summary.total_return - 0.001).abs() < 1e-12);
    }
}
