//! TOML run configuration.
//!
//! A run is fully described by one [`RunConfig`]. Files are parsed with
//! `toml`; an override file is deep-merged into a base file before
//! deserialization, so an override only has to name the keys it changes:
//!
//! ```toml
//! [run]
//! symbol = "ETHUSDT"
//!
//! [exit.swing]
//! strategy = "hybrid"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use swingtrail_core::domain::RunId;
use swingtrail_core::engine::SimulationConfig;
use swingtrail_core::evaluators::{EvaluatorSpec, FactoryError};
use swingtrail_core::exit::ExitConfig;
use swingtrail_core::extension::ExtensionConfig;
use swingtrail_core::ledger::CostModel;
use swingtrail_core::levels::LevelConfig;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] swingtrail_core::ConfigError),
    #[error("strategy: {0}")]
    Strategy(#[from] FactoryError),
    #[error("failed to hash configuration: {0}")]
    Hash(#[from] serde_json::Error),
}

/// `[run]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub symbol: String,
    pub timeframe: String,
    pub initial_capital: f64,
    pub warmup_bars: usize,
    pub atr_period: usize,
    pub liquidate_at_end: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        Self {
            symbol: sim.symbol,
            timeframe: sim.timeframe,
            initial_capital: sim.initial_capital,
            warmup_bars: sim.warmup_bars,
            atr_period: sim.atr_period,
            liquidate_at_end: sim.liquidate_at_end,
        }
    }
}

/// Complete, serializable description of one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub run: RunSection,
    pub costs: CostModel,
    pub exit: ExitConfig,
    pub levels: LevelConfig,
    pub strategy: EvaluatorSpec,
    pub extension: ExtensionConfig,
}

impl RunConfig {
    /// Parse a TOML string. Missing sections and keys take their defaults.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&read(path)?)
    }

    /// Deep-merge `overlay` into `base`, then deserialize the result.
    pub fn merged(base: &str, overlay: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = toml::from_str(base)?;
        let overlay: toml::Table = toml::from_str(overlay)?;
        deep_merge(&mut table, overlay);
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// [`RunConfig::merged`] over two files.
    pub fn merge_files(base: &Path, overlay: &Path) -> Result<Self, ConfigError> {
        Self::merged(&read(base)?, &read(overlay)?)
    }

    /// Reject the configuration before any bar is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_simulation_config().validate()?;
        self.levels.validate()?;
        self.extension.validate()?;
        self.strategy.build()?;
        Ok(())
    }

    /// BLAKE3 of the canonical JSON form. Equal configs share an id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        Ok(RunId::from_canonical(self)?)
    }

    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            symbol: self.run.symbol.clone(),
            timeframe: self.run.timeframe.clone(),
            initial_capital: self.run.initial_capital,
            warmup_bars: self.run.warmup_bars,
            atr_period: self.run.atr_period,
            liquidate_at_end: self.run.liquidate_at_end,
            costs: self.costs,
            exit: self.exit.clone(),
        }
    }
}

/// Recursive table merge: tables merge key by key, every other value
/// (arrays included) in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(dst)), toml::Value::Table(src)) => deep_merge(dst, src),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
