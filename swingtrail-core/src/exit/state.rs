//! Per-position exit state: `NONE -> TARGET1_HIT -> TARGET2_HIT`.

use serde::{Deserialize, Serialize};

use crate::domain::PositionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitPhase {
    None,
    Target1Hit,
    Target2Hit,
}

/// Exit flags for one open position.
///
/// Both flags are monotonic while the position is open. `reset` must be
/// called exactly once when a position opens; evaluating the state for any
/// other position id is a programming error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionExitState {
    armed_for: Option<PositionId>,
    target1_hit: bool,
    target2_hit: bool,
    best_level: Option<f64>,
}

impl PositionExitState {
    /// Unarmed state. Must be `reset` before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the state for a freshly opened position, clearing all flags.
    pub fn reset(&mut self, position: PositionId) {
        *self = Self {
            armed_for: Some(position),
            ..Self::default()
        };
    }

    pub fn armed_for(&self) -> Option<PositionId> {
        self.armed_for
    }

    pub fn is_armed_for(&self, position: PositionId) -> bool {
        self.armed_for == Some(position)
    }

    pub fn phase(&self) -> ExitPhase {
        if self.target2_hit {
            ExitPhase::Target2Hit
        } else if self.target1_hit {
            ExitPhase::Target1Hit
        } else {
            ExitPhase::None
        }
    }

    pub fn target1_hit(&self) -> bool {
        self.target1_hit
    }

    pub fn target2_hit(&self) -> bool {
        self.target2_hit
    }

    /// Furthest structural level reached in the position's favor.
    pub fn best_level(&self) -> Option<f64> {
        self.best_level
    }

    pub(crate) fn mark_target1(&mut self) {
        self.target1_hit = true;
    }

    pub(crate) fn mark_target2(&mut self) {
        debug_assert!(self.target1_hit, "target 2 marked before target 1");
        self.target2_hit = true;
    }

    pub(crate) fn observe_level(&mut self, level: f64, better: impl Fn(f64, f64) -> bool) {
        match self.best_level {
            Some(best) if !better(level, best) => {}
            _ => self.best_level = Some(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_arms_and_clears() {
        let mut state = PositionExitState::new();
        assert!(state.armed_for().is_none());
        state.reset(PositionId(1));
        state.mark_target1();
        state.mark_target2();
        assert_eq!(state.phase(), ExitPhase::Target2Hit);

        state.reset(PositionId(2));
        assert!(state.is_armed_for(PositionId(2)));
        assert!(!state.is_armed_for(PositionId(1)));
        assert_eq!(state.phase(), ExitPhase::None);
        assert!(state.best_level().is_none());
    }

    #[test]
    fn best_level_only_improves() {
        let mut state = PositionExitState::new();
        state.reset(PositionId(1));
        let higher = |a: f64, b: f64| a > b;
        state.observe_level(105.0, higher);
        state.observe_level(103.0, higher);
        assert_eq!(state.best_level(), Some(105.0));
        state.observe_level(108.0, higher);
        assert_eq!(state.best_level(), Some(108.0));
    }
}
