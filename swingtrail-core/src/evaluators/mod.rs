//! Built-in strategy evaluators and the factory that builds them from config.

pub mod donchian;
pub mod ma_cross;

pub use donchian::DonchianEvaluator;
pub use ma_cross::MaCrossEvaluator;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{NullEvaluator, StrategyEvaluator};

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    #[error("unknown evaluator type: {0}")]
    UnknownEvaluator(String),
    #[error("unknown parameter `{param}` for evaluator {evaluator}")]
    UnknownParam { evaluator: String, param: String },
    #[error("invalid parameter `{param}` = {value}: {reason}")]
    InvalidParam {
        param: String,
        value: f64,
        reason: &'static str,
    },
}

// ─── Factory ─────────────────────────────────────────────────────────

/// Evaluator type plus numeric parameters.
///
/// `BTreeMap` keeps serialization (and therefore run ids) deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: BTreeMap<String, f64>,
}

impl Default for EvaluatorSpec {
    fn default() -> Self {
        Self {
            kind: "ma_cross".into(),
            params: BTreeMap::new(),
        }
    }
}

impl EvaluatorSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Build the evaluator. Missing parameters take their defaults.
    pub fn build(&self) -> Result<Box<dyn StrategyEvaluator>, FactoryError> {
        match self.kind.as_str() {
            "ma_cross" => {
                self.check_known(&["fast", "slow", "size", "allow_short"])?;
                let fast = self.period("fast", 10)?;
                let slow = self.period("slow", 30)?;
                if fast >= slow {
                    return Err(FactoryError::InvalidParam {
                        param: "fast".into(),
                        value: fast as f64,
                        reason: "must be smaller than slow",
                    });
                }
                Ok(Box::new(MaCrossEvaluator::new(
                    fast,
                    slow,
                    self.size()?,
                    self.flag("allow_short"),
                )))
            }
            "donchian" => {
                self.check_known(&["lookback", "size", "allow_short"])?;
                Ok(Box::new(DonchianEvaluator::new(
                    self.period("lookback", 20)?,
                    self.size()?,
                    self.flag("allow_short"),
                )))
            }
            "null" => {
                self.check_known(&[])?;
                Ok(Box::new(NullEvaluator))
            }
            other => Err(FactoryError::UnknownEvaluator(other.to_string())),
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────

    fn check_known(&self, known: &[&str]) -> Result<(), FactoryError> {
        match self.params.keys().find(|k| !known.contains(&k.as_str())) {
            Some(param) => Err(FactoryError::UnknownParam {
                evaluator: self.kind.clone(),
                param: param.clone(),
            }),
            None => Ok(()),
        }
    }

    fn period(&self, name: &str, default: usize) -> Result<usize, FactoryError> {
        match self.params.get(name).copied() {
            None => Ok(default),
            Some(v) if v.is_finite() && v >= 1.0 && v.fract() == 0.0 => Ok(v as usize),
            Some(v) => Err(FactoryError::InvalidParam {
                param: name.to_string(),
                value: v,
                reason: "must be a positive integer",
            }),
        }
    }

    fn size(&self) -> Result<f64, FactoryError> {
        match self.params.get("size").copied() {
            None => Ok(1.0),
            Some(v) if v.is_finite() && v > 0.0 => Ok(v),
            Some(v) => Err(FactoryError::InvalidParam {
                param: "size".into(),
                value: v,
                reason: "must be positive",
            }),
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.params.get(name).is_some_and(|v| *v != 0.0)
    }
}
