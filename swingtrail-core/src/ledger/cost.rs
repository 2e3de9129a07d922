//! Execution cost model: proportional commission and slippage.

use crate::domain::PositionSide;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Proportional costs applied on every fill.
///
/// - Slippage moves the fill price against the trader: longs pay up on entry
///   and receive less on exit, shorts the mirror image.
/// - Commission is `size × fill_price × commission_rate`, charged on every
///   open and every (partial or full) close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub commission_rate: f64,
    pub slippage_rate: f64,
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.commission_rate.is_finite() && self.commission_rate >= 0.0) {
            return Err(ConfigError::Negative {
                field: "costs.commission_rate",
                value: self.commission_rate,
            });
        }
        if !(self.slippage_rate.is_finite() && (0.0..1.0).contains(&self.slippage_rate)) {
            return Err(ConfigError::OutOfRange {
                field: "costs.slippage_rate",
                value: self.slippage_rate,
                expected: "[0, 1)",
            });
        }
        Ok(())
    }

    /// Fill price for opening a position on `side` at reference `price`.
    pub fn entry_fill(&self, side: PositionSide, price: f64) -> f64 {
        match side {
            PositionSide::Long => price * (1.0 + self.slippage_rate),
            PositionSide::Short => price * (1.0 - self.slippage_rate),
        }
    }

    /// Fill price for closing a position on `side` at reference `price`.
    pub fn exit_fill(&self, side: PositionSide, price: f64) -> f64 {
        match side {
            PositionSide::Long => price * (1.0 - self.slippage_rate),
            PositionSide::Short => price * (1.0 + self.slippage_rate),
        }
    }

    pub fn commission(&self, size: f64, fill_price: f64) -> f64 {
        size * fill_price * self.commission_rate
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(0.001, 0.0005)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_is_always_unfavorable() {
        let costs = CostModel::new(0.0, 0.01);
        assert!((costs.entry_fill(PositionSide::Long, 100.0) - 101.0).abs() < 1e-12);
        assert!((costs.entry_fill(PositionSide::Short, 100.0) - 99.0).abs() < 1e-12);
        assert!((costs.exit_fill(PositionSide::Long, 100.0) - 99.0).abs() < 1e-12);
        assert!((costs.exit_fill(PositionSide::Short, 100.0) - 101.0).abs() < 1e-12);
    }

    #[test]
    fn commission_scales_with_notional() {
        let costs = CostModel::new(0.001, 0.0);
        assert!((costs.commission(2.0, 50.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_rates() {
        assert!(CostModel::new(-0.1, 0.0).validate().is_err());
        assert!(CostModel::new(0.0, 1.5).validate().is_err());
        assert!(CostModel::default().validate().is_ok());
    }
}
