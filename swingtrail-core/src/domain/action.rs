//! Strategy actions.

use super::position::PositionSide;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action proposed by a strategy evaluator for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Long,
    Short,
    #[default]
    None,
}

impl Action {
    pub fn side(self) -> Option<PositionSide> {
        match self {
            Action::Long => Some(PositionSide::Long),
            Action::Short => Some(PositionSide::Short),
            Action::None => None,
        }
    }

    /// Long or short. A sided action may still only close a position
    /// (size 0) or be rejected by the ledger.
    pub fn is_sided(self) -> bool {
        self != Action::None
    }
}

impl From<PositionSide> for Action {
    fn from(side: PositionSide) -> Self {
        match side {
            PositionSide::Long => Action::Long,
            PositionSide::Short => Action::Short,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Long => write!(f, "LONG"),
            Action::Short => write!(f, "SHORT"),
            Action::None => write!(f, "NONE"),
        }
    }
}
