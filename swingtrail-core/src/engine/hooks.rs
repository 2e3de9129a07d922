//! Hook points through which extensions observe and veto the simulation.
//!
//! # Ordering contract
//!
//! - `on_decision` runs once per post-warmup bar, before any execution. Its
//!   verdict can only withdraw the opening half of a decision: a vetoed
//!   entry becomes no action, a vetoed reversal still closes the held
//!   position. A hook has no way to create or enlarge an order.
//! - `on_execution` runs only after the ledger reports `executed == true`.
//!   Rejected or vetoed signals never reach it, so any counter advanced here
//!   tracks real fills. Components that advance state from `on_decision`
//!   instead produce phantom trades.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::evaluator::Decision;
use crate::domain::{Action, ExitReason, PositionSide};
use crate::ledger::ExecutionResult;

/// Outcome of `on_decision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookVerdict {
    Allow,
    Veto { component: String, reason: String },
}

impl HookVerdict {
    pub fn is_veto(&self) -> bool {
        matches!(self, HookVerdict::Veto { .. })
    }
}

/// Per-bar view handed to `on_decision`.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub price: f64,
    pub decision: &'a Decision,
    pub open_side: Option<PositionSide>,
    /// LTF bars since the structural levels were last refreshed.
    pub level_data_age: Option<usize>,
}

impl DecisionContext<'_> {
    /// Executing the decision would open a position: positive size on a
    /// side other than the one held. Pure closes and same-side repeats
    /// (which the ledger rejects) do not.
    pub fn opens_position(&self) -> bool {
        self.decision.size > 0.0
            && self
                .decision
                .action
                .side()
                .is_some_and(|side| self.open_side != Some(side))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// A position was opened (including the open half of a reversal).
    Entry,
    /// Size was closed: partial, full, stop or liquidation.
    Exit,
}

/// A confirmed ledger execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub kind: ExecutionKind,
    pub action: Action,
    pub price: f64,
    pub result: ExecutionResult,
    pub exit_reason: Option<ExitReason>,
}

pub trait SimulationHook: Send {
    fn on_decision(&mut self, ctx: &DecisionContext<'_>) -> HookVerdict;

    /// Only called for executions the ledger confirmed.
    fn on_execution(&mut self, event: &ExecutionEvent);
}
