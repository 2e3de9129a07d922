//! Configuration surface of the exit subsystem.

use serde::{Deserialize, Serialize};

use super::swing::SwingUpdateConfig;
use crate::error::{require_fraction, require_non_negative, ConfigError};

/// Exit subsystem settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub enable_partials: bool,
    pub enable_trailing: bool,
    pub enable_structure_breaks: bool,
    /// Fraction of the original size closed at target 1.
    pub partial_1_fraction: f64,
    /// Fraction of the remaining size closed at target 2.
    pub partial_2_fraction: f64,
    /// Proximity tolerance for level checks, in ATR units.
    pub level_tolerance_atr: f64,
    /// ATR multiple for the volatility stop.
    pub trailing_atr_multiplier: f64,
    pub swing: SwingUpdateConfig,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            enable_partials: true,
            enable_trailing: true,
            enable_structure_breaks: false,
            partial_1_fraction: 0.33,
            partial_2_fraction: 0.5,
            level_tolerance_atr: 0.0,
            trailing_atr_multiplier: 2.0,
            swing: SwingUpdateConfig::default(),
        }
    }
}

impl ExitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_fraction("exit.partial_1_fraction", self.partial_1_fraction)?;
        require_fraction("exit.partial_2_fraction", self.partial_2_fraction)?;
        require_non_negative("exit.level_tolerance_atr", self.level_tolerance_atr)?;
        require_non_negative("exit.trailing_atr_multiplier", self.trailing_atr_multiplier)?;
        self.swing.validate()
    }
}
