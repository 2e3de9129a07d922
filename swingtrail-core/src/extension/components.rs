//! Built-in veto components.

use super::chain::{VetoCheck, VetoComponent};
use crate::engine::{DecisionContext, ExecutionEvent, ExecutionKind};

/// Minimum number of bars between executed entries.
///
/// Only confirmed entries (from `on_execution`) start a new cooldown.
#[derive(Debug, Clone)]
pub struct CooldownVeto {
    min_bars: usize,
    last_entry_bar: Option<usize>,
    entries_seen: usize,
}

impl CooldownVeto {
    pub fn new(min_bars: usize) -> Self {
        Self {
            min_bars,
            last_entry_bar: None,
            entries_seen: 0,
        }
    }

    pub fn last_entry_bar(&self) -> Option<usize> {
        self.last_entry_bar
    }

    pub fn entries_seen(&self) -> usize {
        self.entries_seen
    }
}

impl VetoComponent for CooldownVeto {
    fn name(&self) -> &str {
        "cooldown"
    }

    fn check(&self, ctx: &DecisionContext<'_>) -> VetoCheck {
        let Some(last) = self.last_entry_bar else {
            return VetoCheck::allow(1.0);
        };
        let elapsed = ctx.bar_index.saturating_sub(last);
        let score = if self.min_bars == 0 {
            1.0
        } else {
            (elapsed as f64 / self.min_bars as f64).min(1.0)
        };
        if elapsed < self.min_bars {
            VetoCheck::veto(score, format!("cooldown {elapsed}/{} bars", self.min_bars))
        } else {
            VetoCheck::allow(score)
        }
    }

    fn on_execution(&mut self, event: &ExecutionEvent) {
        if event.kind == ExecutionKind::Entry {
            self.last_entry_bar = Some(event.bar_index);
            self.entries_seen += 1;
        }
    }
}

/// Rejects entries whose evaluator confidence is below a floor.
#[derive(Debug, Clone)]
pub struct ConfidenceVeto {
    min_confidence: f64,
}

impl ConfidenceVeto {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

impl VetoComponent for ConfidenceVeto {
    fn name(&self) -> &str {
        "confidence"
    }

    fn check(&self, ctx: &DecisionContext<'_>) -> VetoCheck {
        let confidence = ctx.decision.confidence;
        if confidence.is_finite() && confidence >= self.min_confidence {
            VetoCheck::allow(confidence.clamp(0.0, 1.0))
        } else {
            let shown = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
            VetoCheck::veto(
                shown,
                format!("confidence {confidence:.3} < {:.3}", self.min_confidence),
            )
        }
    }
}

/// Rejects entries when the structural levels are missing or stale.
#[derive(Debug, Clone)]
pub struct LevelAgeVeto {
    max_age: usize,
}

impl LevelAgeVeto {
    pub fn new(max_age: usize) -> Self {
        Self { max_age }
    }
}

impl VetoComponent for LevelAgeVeto {
    fn name(&self) -> &str {
        "level_age"
    }

    fn check(&self, ctx: &DecisionContext<'_>) -> VetoCheck {
        match ctx.level_data_age {
            None => VetoCheck::veto(0.0, "no levels"),
            Some(age) => {
                let score = 1.0 - (age as f64 / (self.max_age + 1) as f64).min(1.0);
                if age > self.max_age {
                    VetoCheck::veto(score, format!("levels {age} bars old > {}", self.max_age))
                } else {
                    VetoCheck::allow(score)
                }
            }
        }
    }
}
