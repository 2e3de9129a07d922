//! Backtest runner: wires configuration, bars, simulator and metrics.
//!
//! Three entry points:
//! - `run_backtest()`: config + bars already in memory.
//! - `run_from_source()`: loads bars first; never returns `Err`, failures
//!   come back as `RunOutcome::Failed` so batch callers can continue.
//! - `run_batch()`: many configs in parallel (rayon), output order = input order.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use swingtrail_core::domain::{Bar, RunId};
use swingtrail_core::engine::{RunResult, Simulator};
use swingtrail_core::extension::AttributionReport;
use swingtrail_core::levels::FibLevelProvider;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{dataset_hash, load_bars, BarSource, LoadError, LoadedBars};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] swingtrail_core::engine::RunError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: RunConfig,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub result: RunResult,
    pub metrics: PerformanceMetrics,
    /// Present only when the extension layer was enabled.
    pub attribution: Option<AttributionReport>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Structured per-run outcome for batch callers.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Box<BacktestResult>),
    Failed {
        symbol: String,
        run_id: Option<RunId>,
        error: RunError,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn result(&self) -> Option<&BacktestResult> {
        match self {
            RunOutcome::Completed(r) => Some(r),
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RunError> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Run one backtest over bars already in memory.
pub fn run_backtest(config: &RunConfig, bars: &[Bar]) -> Result<BacktestResult, RunError> {
    execute(config, bars, dataset_hash(bars), false)
}

/// [`run_backtest`] over bars that came through the loader, keeping their
/// provenance.
pub fn run_loaded(config: &RunConfig, loaded: &LoadedBars) -> Result<BacktestResult, RunError> {
    execute(
        config,
        &loaded.bars,
        loaded.dataset_hash.clone(),
        loaded.synthetic,
    )
}

/// Load bars from `source` and run. Failures are returned, not raised.
pub fn run_from_source(config: &RunConfig, source: &BarSource) -> RunOutcome {
    let outcome = load_bars(source, &config.run.symbol)
        .map_err(RunError::from)
        .and_then(|loaded| run_loaded(config, &loaded));
    match outcome {
        Ok(result) => RunOutcome::Completed(Box::new(result)),
        Err(error) => {
            warn!("run for {} failed: {error}", config.run.symbol);
            RunOutcome::Failed {
                symbol: config.run.symbol.clone(),
                run_id: config.run_id().ok(),
                error,
            }
        }
    }
}

/// Run every config against `source` in parallel.
///
/// Each run owns its own simulator state; one failure does not stop the
/// others.
pub fn run_batch(configs: &[RunConfig], source: &BarSource) -> Vec<RunOutcome> {
    let outcomes: Vec<RunOutcome> = configs
        .par_iter()
        .map(|config| run_from_source(config, source))
        .collect();
    let failed = outcomes.iter().filter(|o| !o.is_completed()).count();
    info!("batch finished: {} runs, {failed} failed", outcomes.len());
    outcomes
}

fn execute(
    config: &RunConfig,
    bars: &[Bar],
    dataset_hash: String,
    synthetic: bool,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let evaluator = config.strategy.build().map_err(ConfigError::from)?;
    let levels = FibLevelProvider::new(bars, config.levels.clone());
    let mut chain = config.extension.build_chain();

    let mut simulator = Simulator::new(config.to_simulation_config(), evaluator.as_ref(), &levels);
    if let Some(chain) = chain.as_mut() {
        simulator = simulator.with_hook(chain);
    }
    let result = simulator.run(bars)?;
    let attribution = chain.map(|c| c.into_report());
    let metrics = PerformanceMetrics::compute(&result);

    info!(
        "run {} ({} {}): {} trades, return {:.2}%, max dd {:.2}%",
        run_id.short(),
        result.metadata.symbol,
        result.metadata.timeframe,
        result.trades.len(),
        metrics.total_return * 100.0,
        metrics.max_drawdown.pct * 100.0,
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        dataset_hash,
        synthetic,
        result,
        metrics,
        attribution,
    })
}
