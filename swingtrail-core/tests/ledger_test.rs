//! Ledger integration tests: fills, costs and the accounting identity.

use chrono::{NaiveDate, NaiveDateTime};
use swingtrail_core::domain::{Action, ExitReason, PositionSide};
use swingtrail_core::ledger::{CostModel, ExecutionReason, Ledger, ProfitFactor, Rejection};

fn ts(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[test]
fn long_point_one_from_100_to_110_makes_one() {
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, CostModel::frictionless());
    ledger.execute(Action::Long, 0.1, 100.0, ts(0));
    ledger.close_all(110.0, ts(1));
    let trade = &ledger.trades()[0];
    assert!((trade.realized_pnl - 1.0).abs() < 1e-9);
    assert!((trade.realized_pnl_pct - 10.0).abs() < 1e-9);
    assert_eq!(trade.exit_reason, ExitReason::ForcedLiquidation);
    assert_eq!(trade.remaining_size, 0.0);
}

#[test]
fn slippage_moves_both_fills_against_the_trader() {
    let costs = CostModel::new(0.0, 0.001);
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, costs);
    ledger.execute(Action::Short, 1.0, 100.0, ts(0));
    assert!((ledger.position().unwrap().entry_price - 99.9).abs() < 1e-9);
    ledger.close(90.0, ts(1), ExitReason::SignalClose);
    let trade = &ledger.trades()[0];
    assert!((trade.exit_price - 90.09).abs() < 1e-9);
    assert!((trade.realized_pnl - (99.9 - 90.09)).abs() < 1e-9);
}

#[test]
fn commissions_hit_capital_even_on_winners() {
    let costs = CostModel::new(0.001, 0.0);
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, costs);
    ledger.execute(Action::Long, 2.0, 100.0, ts(0));
    assert!((ledger.capital() - 999.8).abs() < 1e-9);
    ledger.close(101.0, ts(1), ExitReason::SignalClose);
    // +2.0 pnl, 0.2 + 0.202 commission
    assert!((ledger.capital() - 1_001.598).abs() < 1e-9);
    assert!((ledger.total_commission() - 0.402).abs() < 1e-9);
    assert!((ledger.trades()[0].commission - 0.402).abs() < 1e-9);
}

#[test]
fn partial_commissions_sum_to_total_once_flat() {
    let costs = CostModel::new(0.002, 0.0005);
    let mut ledger = Ledger::new("ETHUSDT", 5_000.0, costs);
    ledger.execute(Action::Long, 3.0, 200.0, ts(0));
    ledger.reduce(1.0, 210.0, ts(1), ExitReason::PartialTarget1);
    ledger.reduce(1.0, 215.0, ts(2), ExitReason::PartialTarget2);
    ledger.close(205.0, ts(3), ExitReason::StopHit);

    let trades = ledger.trades();
    assert_eq!(trades.len(), 3);
    assert_eq!(trades.iter().filter(|t| t.is_partial).count(), 2);
    assert_eq!(trades[0].remaining_size, 2.0);
    assert_eq!(trades[1].remaining_size, 1.0);

    let fees: f64 = trades.iter().map(|t| t.commission).sum();
    let pnl: f64 = trades.iter().map(|t| t.realized_pnl).sum();
    assert!((fees - ledger.total_commission()).abs() < 1e-9);
    assert!((ledger.capital() - (5_000.0 + pnl - fees)).abs() < 1e-9);
}

#[test]
fn reversal_closes_then_opens_in_one_call() {
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, CostModel::frictionless());
    ledger.execute(Action::Long, 1.0, 100.0, ts(0));
    let result = ledger.execute(Action::Short, 2.0, 95.0, ts(1));
    assert!(result.executed);
    assert_eq!(result.reason, ExecutionReason::Opened);
    assert_eq!(ledger.trades().len(), 1);
    assert_eq!(ledger.trades()[0].exit_reason, ExitReason::SignalClose);
    let pos = ledger.position().unwrap();
    assert_eq!(pos.side, PositionSide::Short);
    assert_eq!(pos.size, 2.0);
}

#[test]
fn rejections_leave_state_untouched() {
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, CostModel::default());
    for (action, size, price, rejection) in [
        (Action::Long, 1.0, 0.0, Rejection::InvalidPrice),
        (Action::Long, 1.0, -5.0, Rejection::InvalidPrice),
        (Action::Long, f64::NAN, 100.0, Rejection::InvalidSize),
        (Action::Short, 0.0, 100.0, Rejection::InvalidSize),
    ] {
        let result = ledger.execute(action, size, price, ts(0));
        assert!(!result.executed);
        assert_eq!(result.reason, ExecutionReason::Rejected(rejection));
    }
    assert!(!ledger.has_position());
    assert_eq!(ledger.capital(), 1_000.0);
    assert_eq!(ledger.total_commission(), 0.0);
}

#[test]
fn summary_counts_on_net_pnl() {
    let costs = CostModel::new(0.01, 0.0);
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, costs);
    // +0.5 gross, ~2.0 commission: a net loser
    ledger.execute(Action::Long, 1.0, 100.0, ts(0));
    ledger.close(100.5, ts(1), ExitReason::SignalClose);
    // clear winner
    ledger.execute(Action::Long, 1.0, 100.0, ts(2));
    ledger.close(120.0, ts(3), ExitReason::SignalClose);

    let summary = ledger.summary();
    assert_eq!(summary.num_trades, 2);
    assert_eq!(summary.wins, 1);
    assert_eq!(summary.losses, 1);
    assert_eq!(summary.win_rate, 0.5);
    match summary.profit_factor {
        ProfitFactor::Finite(pf) => assert!(pf > 1.0),
        ProfitFactor::Unbounded => panic!("a loss was recorded"),
    }
}

#[test]
fn profit_factor_sentinel_serializes() {
    let mut ledger = Ledger::new("BTCUSDT", 1_000.0, CostModel::frictionless());
    ledger.execute(Action::Long, 1.0, 100.0, ts(0));
    ledger.close(101.0, ts(1), ExitReason::SignalClose);
    let summary = ledger.summary();
    assert_eq!(summary.profit_factor, ProfitFactor::Unbounded);
    let json = serde_json::to_string(&summary).unwrap();
    assert!(!json.contains("null"), "{json}");
}
