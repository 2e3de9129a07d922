//! Exit signal engine: partial exits and stop trailing from structural levels.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::ExitConfig;
use super::state::PositionExitState;
use super::swing::{SwingState, TrailThreshold};
use crate::domain::{ExitReason, Position, PositionSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitAction {
    Hold,
    PartialExit,
    FullExit,
    UpdateStop,
}

/// What a partial-exit fraction is taken of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBasis {
    Original,
    Remaining,
}

/// Reason code attached to an exit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitCode {
    Hold,
    PartialTarget1,
    PartialTarget2,
    TrailBreakeven,
    TrailTarget1,
    StructureBreak,
    NoLevels,
    InvalidInput,
    StateNotArmed,
}

impl ExitCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitCode::Hold => "hold",
            ExitCode::PartialTarget1 => "partial-target-1",
            ExitCode::PartialTarget2 => "partial-target-2",
            ExitCode::TrailBreakeven => "trail-breakeven",
            ExitCode::TrailTarget1 => "trail-target-1",
            ExitCode::StructureBreak => "structure-break",
            ExitCode::NoLevels => "no-levels",
            ExitCode::InvalidInput => "invalid-input",
            ExitCode::StateNotArmed => "state-not-armed",
        }
    }

    /// Trade exit reason for codes that close size.
    pub fn exit_reason(self) -> Option<ExitReason> {
        match self {
            ExitCode::PartialTarget1 => Some(ExitReason::PartialTarget1),
            ExitCode::PartialTarget2 => Some(ExitReason::PartialTarget2),
            ExitCode::StructureBreak => Some(ExitReason::StructureTrail),
            _ => None,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub action: ExitAction,
    /// In (0, 1]; only meaningful for `PartialExit`.
    pub fraction: f64,
    pub basis: SizeBasis,
    pub code: ExitCode,
    pub new_stop: Option<f64>,
    pub target: Option<f64>,
}

impl ExitSignal {
    pub fn hold(code: ExitCode) -> Self {
        Self {
            action: ExitAction::Hold,
            fraction: 0.0,
            basis: SizeBasis::Remaining,
            code,
            new_stop: None,
            target: None,
        }
    }

    fn partial(fraction: f64, basis: SizeBasis, code: ExitCode, target: f64) -> Self {
        Self {
            action: ExitAction::PartialExit,
            fraction,
            basis,
            code,
            new_stop: None,
            target: Some(target),
        }
    }

    fn full(code: ExitCode) -> Self {
        Self {
            action: ExitAction::FullExit,
            fraction: 1.0,
            basis: SizeBasis::Remaining,
            code,
            new_stop: None,
            target: None,
        }
    }

    fn update_stop(stop: f64, code: ExitCode) -> Self {
        Self {
            action: ExitAction::UpdateStop,
            fraction: 0.0,
            basis: SizeBasis::Remaining,
            code,
            new_stop: Some(stop),
            target: None,
        }
    }

    /// Absolute quantity a `PartialExit` closes for `position`.
    pub fn quantity(&self, position: &Position) -> f64 {
        let base = match self.basis {
            SizeBasis::Original => position.original_size,
            SizeBasis::Remaining => position.size,
        };
        (self.fraction * base).min(position.size)
    }
}

/// Market inputs for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ExitInput<'a> {
    pub price: f64,
    pub atr: f64,
    pub position: &'a Position,
}

/// Levels beyond `entry` in the favorable direction, nearest first.
pub fn favorable_targets(levels: &[f64], entry: f64, side: PositionSide) -> Vec<f64> {
    let mut targets: Vec<f64> = levels
        .iter()
        .copied()
        .filter(|&level| side.is_better(level, entry))
        .collect();
    match side {
        PositionSide::Long => targets.sort_by(|a, b| a.total_cmp(b)),
        PositionSide::Short => targets.sort_by(|a, b| b.total_cmp(a)),
    }
    targets
}

/// Stateless evaluator; all mutable state lives in `PositionExitState` and
/// `SwingState`, owned alongside the position.
#[derive(Debug, Clone)]
pub struct ExitSignalEngine {
    config: ExitConfig,
}

impl ExitSignalEngine {
    pub fn new(config: ExitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExitConfig {
        &self.config
    }

    /// Evaluate the open position.
    ///
    /// Order of checks: structure break, target 1, target 2, stop trail, hold.
    /// Missing or non-finite inputs produce `Hold`, never an error.
    pub fn evaluate(
        &self,
        state: &mut PositionExitState,
        swing: Option<&mut SwingState>,
        input: &ExitInput<'_>,
    ) -> ExitSignal {
        let position = input.position;
        if !state.is_armed_for(position.id) {
            debug_assert!(
                false,
                "exit state armed for {:?} evaluated for position {:?}",
                state.armed_for(),
                position.id
            );
            return ExitSignal::hold(ExitCode::StateNotArmed);
        }
        if !(input.price.is_finite() && input.price > 0.0) {
            return ExitSignal::hold(ExitCode::InvalidInput);
        }
        let Some(swing) = swing else {
            return ExitSignal::hold(ExitCode::NoLevels);
        };

        let side = position.side;
        let tolerance = if input.atr.is_finite() && input.atr > 0.0 {
            self.config.level_tolerance_atr * input.atr
        } else {
            0.0
        };
        let reached = |level: f64| match side {
            PositionSide::Long => input.price >= level - tolerance,
            PositionSide::Short => input.price <= level + tolerance,
        };

        if self.config.enable_structure_breaks && swing.anchor.valid {
            let extreme = swing.anchor.protective_extreme(side);
            let broken = extreme.is_finite()
                && match side {
                    PositionSide::Long => input.price < extreme - tolerance,
                    PositionSide::Short => input.price > extreme + tolerance,
                };
            if broken {
                return ExitSignal::full(ExitCode::StructureBreak);
            }
        }

        let levels = &swing.anchor.levels;
        if levels.is_empty() || levels.iter().any(|l| !l.is_finite()) {
            return ExitSignal::hold(ExitCode::NoLevels);
        }
        let targets = favorable_targets(levels, position.entry_price, side);

        for &level in targets.iter().filter(|&&l| reached(l)) {
            state.observe_level(level, |a, b| side.is_better(a, b));
        }

        if let (false, Some(&t1)) = (state.target1_hit(), targets.first()) {
            if reached(t1) {
                state.mark_target1();
                if self.config.enable_partials {
                    return ExitSignal::partial(
                        self.config.partial_1_fraction,
                        SizeBasis::Original,
                        ExitCode::PartialTarget1,
                        t1,
                    );
                }
            }
        } else if let (true, false, Some(&t2)) =
            (state.target1_hit(), state.target2_hit(), targets.get(1))
        {
            if reached(t2) {
                state.mark_target2();
                if self.config.enable_partials {
                    return ExitSignal::partial(
                        self.config.partial_2_fraction,
                        SizeBasis::Remaining,
                        ExitCode::PartialTarget2,
                        t2,
                    );
                }
            }
        }

        if self.config.enable_trailing {
            let proposal = if state.target2_hit() {
                targets
                    .first()
                    .map(|&t1| (TrailThreshold::Target1, t1, ExitCode::TrailTarget1))
            } else if state.target1_hit() {
                Some((
                    TrailThreshold::Breakeven,
                    position.entry_price,
                    ExitCode::TrailBreakeven,
                ))
            } else {
                None
            };
            if let Some((threshold, stop, code)) = proposal {
                if swing.triggered.insert(threshold) {
                    return ExitSignal::update_stop(stop, code);
                }
            }
        }

        ExitSignal::hold(ExitCode::Hold)
    }
}
