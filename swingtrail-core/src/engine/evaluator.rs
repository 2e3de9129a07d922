//! Strategy-evaluator contract.
//!
//! The evaluator sees the as-of bar window and a versioned carry-over value,
//! and returns a `Decision` holding the next carry-over value. It never sees
//! the ledger or the exit state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::SimulationConfig;
use crate::domain::{Action, Bar};

/// Evaluator-owned state threaded from one bar to the next.
///
/// `version` increases by one every time the simulator accepts a new value,
/// so a stale state is detectable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarryState {
    pub version: u64,
    pub values: BTreeMap<String, f64>,
}

impl CarryState {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }
}

/// What the evaluator proposes for one bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub size: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub regime: Option<String>,
    pub features: BTreeMap<String, f64>,
    pub carry: CarryState,
    pub reasons: Vec<String>,
}

impl Decision {
    /// No action, carrying `carry` forward unchanged.
    pub fn hold(carry: CarryState) -> Self {
        Self {
            carry,
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// Everything an evaluator may read at bar `bar_index`.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// `bars[..=bar_index]`: nothing after the current bar's close.
    pub window: &'a [Bar],
    pub bar_index: usize,
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub config: &'a SimulationConfig,
}

impl EvalContext<'_> {
    pub fn current(&self) -> Option<&Bar> {
        self.window.last()
    }
}

/// Evaluator failure. Terminates the run with bar/symbol context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait StrategyEvaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Bars the evaluator needs before its decisions are meaningful.
    fn warmup_bars(&self) -> usize {
        0
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, carry: CarryState) -> Result<Decision, EvalError>;
}

/// Evaluator that never trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvaluator;

impl StrategyEvaluator for NullEvaluator {
    fn name(&self) -> &str {
        "null"
    }

    fn evaluate(&self, _ctx: &EvalContext<'_>, carry: CarryState) -> Result<Decision, EvalError> {
        Ok(Decision::hold(carry))
    }
}
