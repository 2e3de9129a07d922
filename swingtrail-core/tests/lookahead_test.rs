//! Look-ahead contamination tests.
//!
//! Nothing observed at bar t may depend on bars after t.
//!
//! Method: compute on a truncated series and on the full series, then assert
//! the overlapping prefix is identical. Any difference means future bars
//! leaked into past values.

use chrono::{Duration, NaiveDate};
use swingtrail_core::domain::Bar;
use swingtrail_core::engine::{SimulationConfig, Simulator};
use swingtrail_core::evaluators::MaCrossEvaluator;
use swingtrail_core::indicators::{Atr, Indicator};
use swingtrail_core::levels::{FibLevelProvider, LevelConfig, LevelProvider};

fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // LCG walk, -5.0 to +5.0 per bar
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05;
        price = (price + change).max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;
        bars.push(Bar {
            timestamp: base + Duration::hours(i as i64),
            open,
            high: open.max(close) + 2.0,
            low: open.min(close) - 2.0,
            close,
            volume: 1_000.0 + i as f64 * 10.0,
        });
    }
    bars
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let full = indicator.compute(full_bars);
    let truncated = indicator.compute(&full_bars[..truncated_len]);
    assert_eq!(truncated.len(), truncated_len, "{}: length", indicator.name());
    assert_eq!(full.len(), full_bars.len(), "{}: length", indicator.name());

    for i in 0..truncated_len {
        let (t, f) = (truncated[i], full[i]);
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            (t - f).abs() < 1e-12,
            "{}: mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
    }
}

#[test]
fn atr_has_no_lookahead() {
    let bars = make_test_bars(200);
    for period in [1, 5, 14, 30] {
        assert_no_lookahead(&Atr::new(period), &bars, 100);
    }
}

#[test]
fn fib_snapshots_ignore_future_bars() {
    let bars = make_test_bars(200);
    // 101 is not a multiple of the HTF factor: the partial HTF bar at the
    // end of the truncated series must not show up.
    for (factor, truncated_len) in [(1, 100), (4, 101), (6, 150)] {
        let config = LevelConfig {
            htf_factor: factor,
            swing_lookback: 5,
            ..LevelConfig::default()
        };
        let full = FibLevelProvider::new(&bars, config.clone());
        let truncated = FibLevelProvider::new(&bars[..truncated_len], config);
        for t in 0..truncated_len {
            assert_eq!(
                truncated.snapshot(t),
                full.snapshot(t),
                "factor {factor}: snapshot mismatch at bar {t}"
            );
        }
    }
}

#[test]
fn simulation_prefix_matches_full_run() {
    let bars = make_test_bars(300);
    let truncated_len = 180;
    let config = SimulationConfig {
        liquidate_at_end: false,
        ..SimulationConfig::default()
    };
    let evaluator = MaCrossEvaluator::new(5, 20, 1.0, true);
    let run = |bars: &[Bar]| {
        let levels = FibLevelProvider::new(bars, LevelConfig::default());
        Simulator::new(config.clone(), &evaluator, &levels)
            .run(bars)
            .unwrap()
    };

    let full = run(&bars);
    let truncated = run(&bars[..truncated_len]);

    assert_eq!(truncated.equity_curve.len(), truncated_len);
    assert_eq!(
        truncated.equity_curve[..],
        full.equity_curve[..truncated_len]
    );

    let cutoff = bars[truncated_len - 1].timestamp;
    let full_closed: Vec<_> = full
        .trades
        .iter()
        .filter(|t| t.exit_time <= cutoff)
        .cloned()
        .collect();
    assert_eq!(truncated.trades, full_closed);
}
