//! Higher-timeframe structural levels, looked up as of a simulation bar.

pub mod fib;

pub use fib::FibLevelProvider;

use serde::{Deserialize, Serialize};

use crate::error::{require_positive, ConfigError};
use crate::exit::SwingAnchor;

/// Levels visible at one LTF bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub anchor: SwingAnchor,
    /// LTF bars since the most recent HTF bar closed.
    pub data_age: usize,
}

impl LevelSnapshot {
    pub fn levels(&self) -> &[f64] {
        &self.anchor.levels
    }
}

/// As-of lookup of structural levels.
///
/// Implementations must never expose levels derived from HTF bars that had
/// not closed by `bar_index`.
pub trait LevelProvider: Send + Sync {
    fn snapshot(&self, bar_index: usize) -> Option<LevelSnapshot>;
}

/// Provider that never has levels. The exit engine then only holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLevels;

impl LevelProvider for NoLevels {
    fn snapshot(&self, _bar_index: usize) -> Option<LevelSnapshot> {
        None
    }
}

/// Settings for [`FibLevelProvider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// LTF bars per HTF bar.
    pub htf_factor: usize,
    /// Closed HTF bars the swing is measured over.
    pub swing_lookback: usize,
    pub ratios: Vec<f64>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            htf_factor: 4,
            swing_lookback: 5,
            ratios: vec![0.382, 0.5, 0.618],
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("levels.htf_factor", self.htf_factor as f64)?;
        require_positive("levels.swing_lookback", self.swing_lookback as f64)?;
        if self.ratios.is_empty() {
            return Err(ConfigError::Empty {
                field: "levels.ratios",
            });
        }
        for &r in &self.ratios {
            if !r.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "levels.ratios contains non-finite value {r}"
                )));
            }
        }
        Ok(())
    }
}
