//! Per-run simulation settings.

use serde::{Deserialize, Serialize};

use crate::error::{require_positive, ConfigError};
use crate::exit::ExitConfig;
use crate::ledger::CostModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub symbol: String,
    pub timeframe: String,
    pub initial_capital: f64,
    /// Minimum warmup; the evaluator's own warmup is added on top via `max`.
    pub warmup_bars: usize,
    pub atr_period: usize,
    /// Force-liquidate any open position on the last bar.
    pub liquidate_at_end: bool,
    pub costs: CostModel,
    pub exit: ExitConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            timeframe: "1h".into(),
            initial_capital: 10_000.0,
            warmup_bars: 0,
            atr_period: 14,
            liquidate_at_end: true,
            costs: CostModel::default(),
            exit: ExitConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Empty { field: "symbol" });
        }
        if self.timeframe.trim().is_empty() {
            return Err(ConfigError::Empty { field: "timeframe" });
        }
        require_positive("initial_capital", self.initial_capital)?;
        require_positive("atr_period", self.atr_period as f64)?;
        self.costs.validate()?;
        self.exit.validate()
    }
}
