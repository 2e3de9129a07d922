//! Criterion benchmarks for swingtrail hot paths.
//!
//! Benchmarks:
//! 1. Simulation loop (full run, with and without a veto chain)
//! 2. Exit engine evaluation
//! 3. Indicator and level precompute

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use swingtrail_core::domain::{Bar, Position, PositionId, PositionSide};
use swingtrail_core::engine::{SimulationConfig, Simulator};
use swingtrail_core::evaluators::MaCrossEvaluator;
use swingtrail_core::exit::{
    ExitConfig, ExitInput, ExitSignalEngine, PositionExitState, SwingAnchor, SwingState,
};
use swingtrail_core::extension::ExtensionConfig;
use swingtrail_core::indicators::{Atr, Indicator};
use swingtrail_core::levels::{FibLevelProvider, LevelConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0 + (i as f64 * 0.013).cos() * 4.0;
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

// ── 1. Simulation loop ───────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    for n in [1_000usize, 10_000] {
        let bars = make_bars(n);
        let evaluator = MaCrossEvaluator::new(10, 40, 1.0, true);
        let levels = FibLevelProvider::new(&bars, LevelConfig::default());

        group.bench_with_input(BenchmarkId::new("bare", n), &bars, |b, bars| {
            b.iter(|| {
                Simulator::new(SimulationConfig::default(), &evaluator, &levels)
                    .run(black_box(bars))
            });
        });

        let extension = ExtensionConfig {
            enabled: true,
            cooldown_bars: Some(5),
            min_confidence: Some(0.2),
            max_level_age: Some(8),
        };
        group.bench_with_input(BenchmarkId::new("veto_chain", n), &bars, |b, bars| {
            b.iter(|| {
                let mut chain = extension.build_chain().unwrap();
                Simulator::new(SimulationConfig::default(), &evaluator, &levels)
                    .with_hook(&mut chain)
                    .run(black_box(bars))
            });
        });
    }
    group.finish();
}

// ── 2. Exit engine ───────────────────────────────────────────────────

fn bench_exit_engine(c: &mut Criterion) {
    let engine = ExitSignalEngine::new(ExitConfig::default());
    let position = Position {
        id: PositionId(1),
        instrument: "BENCH".into(),
        side: PositionSide::Long,
        size: 1.0,
        original_size: 1.0,
        entry_price: 100.0,
        entry_time: make_bars(1)[0].timestamp,
        entry_commission: 0.0,
        unrealized_pnl: 0.0,
        stop: None,
        stop_source: None,
    };
    let anchor = SwingAnchor {
        high: 130.0,
        low: 90.0,
        formed_at: 0,
        age_bars: 0,
        valid: true,
        levels: vec![105.3, 110.0, 114.7],
    };
    c.bench_function("exit_engine_path", |b| {
        b.iter(|| {
            let mut state = PositionExitState::new();
            state.reset(position.id);
            let mut swing = SwingState::new(anchor.clone());
            for price in [101.0, 104.0, 106.0, 108.0, 111.0, 112.0, 115.0] {
                black_box(engine.evaluate(
                    &mut state,
                    Some(&mut swing),
                    &ExitInput {
                        price,
                        atr: 1.2,
                        position: &position,
                    },
                ));
            }
        });
    });
}

// ── 3. Precompute ────────────────────────────────────────────────────

fn bench_precompute(c: &mut Criterion) {
    let bars = make_bars(10_000);
    c.bench_function("atr_14_10k", |b| b.iter(|| Atr::new(14).compute(black_box(&bars))));
    c.bench_function("fib_levels_10k", |b| {
        b.iter(|| FibLevelProvider::new(black_box(&bars), LevelConfig::default()))
    });
}

criterion_group!(benches, bench_simulation, bench_exit_engine, bench_precompute);
criterion_main!(benches);
