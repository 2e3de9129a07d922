//! Trade: an immutable record of one full or partial close.

use super::position::PositionSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitReason {
    SignalClose,
    StopHit,
    StructureTrail,
    ForcedLiquidation,
    PartialTarget1,
    PartialTarget2,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::SignalClose => "signal-close",
            ExitReason::StopHit => "stop-hit",
            ExitReason::StructureTrail => "structure-trail",
            ExitReason::ForcedLiquidation => "forced-liquidation",
            ExitReason::PartialTarget1 => "partial-target-1",
            ExitReason::PartialTarget2 => "partial-target-2",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed-position record, created exactly once per full or partial close.
///
/// `realized_pnl` is gross of commission; `commission` is the exit commission
/// plus the pro-rata share of the entry commission for `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub instrument: String,
    pub side: PositionSide,
    pub size: f64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub realized_pnl: f64,
    /// Realized PnL as a percentage of entry notional for `size`.
    pub realized_pnl_pct: f64,
    pub commission: f64,
    pub exit_reason: ExitReason,
    pub is_partial: bool,
    /// Size still open after this close (0 if fully closed).
    pub remaining_size: f64,
}

impl Trade {
    pub fn net_pnl(&self) -> f64 {
        self.realized_pnl - self.commission
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl() > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.net_pnl() < 0.0
    }
}
