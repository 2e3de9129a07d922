//! Run phases, run result and run-level errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EquityPoint, Trade};
use crate::error::ConfigError;
use crate::ledger::LedgerSummary;

/// `Init -> Warmup -> Running -> Finalized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    Init,
    Warmup,
    Running,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no bars for {symbol} {timeframe}")]
    EmptySeries { symbol: String, timeframe: String },

    #[error("evaluator failed at bar {bar_index} ({symbol} {timeframe}): {message}")]
    Evaluator {
        bar_index: usize,
        symbol: String,
        timeframe: String,
        message: String,
    },
}

/// Bookkeeping about a finished run. Contains nothing time- or host-dependent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub symbol: String,
    pub timeframe: String,
    pub evaluator: String,
    pub bars: usize,
    pub warmup_bars: usize,
    pub void_bars: usize,
    pub vetoed_decisions: usize,
    pub swing_updates: u32,
    pub stop_exits: usize,
}

/// Output of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub metadata: RunMetadata,
    pub summary: LedgerSummary,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub phase: RunPhase,
}

impl RunResult {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.equity)
    }
}
