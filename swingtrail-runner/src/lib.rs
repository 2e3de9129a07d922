//! swingtrail runner: configuration, bar loading, orchestration, metrics.
//!
//! This crate builds on `swingtrail-core` to provide:
//! - TOML run configuration with deep-merged overrides
//! - Bar loading from CSV or a seeded synthetic generator
//! - Single-run and parallel batch orchestration with structured outcomes
//! - Performance metrics over finished runs
//! - Atomic artifact persistence (JSON, CSV, Markdown)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, RunConfig, RunSection};
pub use data_loader::{load_bars, BarSource, LoadError, LoadedBars};
pub use export::{generate_report, load_artifacts, save_artifacts};
pub use metrics::{Drawdown, PerformanceMetrics, Streaks};
pub use runner::{
    run_backtest, run_batch, run_from_source, run_loaded, BacktestResult, RunError, RunOutcome,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_config_is_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn run_outcome_is_send() {
        assert_send::<RunOutcome>();
    }

    #[test]
    fn bar_source_is_send_sync() {
        assert_send::<BarSource>();
        assert_sync::<BarSource>();
    }
}
