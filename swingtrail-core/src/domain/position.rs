//! Position: the single open exposure held by a ledger.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for longs, -1 for shorts.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    /// True if `a` is strictly more favorable than `b` for this side.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            PositionSide::Long => a > b,
            PositionSide::Short => a < b,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Identifier of one position instance within a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

/// Where the current stop level came from. Decides the exit reason when hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSource {
    /// ATR-scaled protective or trailing stop.
    Volatility,
    /// Stop moved by the exit signal engine to breakeven or a structural level.
    Structure,
}

/// An open position.
///
/// Invariants while open: `size > 0`, `side` never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub instrument: String,
    pub side: PositionSide,
    pub size: f64,
    /// Size at open. Partial-1 fractions are taken of this, not of `size`.
    pub original_size: f64,
    /// Fill price including slippage.
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    /// Commission paid at open, allocated pro-rata to each closing trade.
    pub entry_commission: f64,
    pub unrealized_pnl: f64,
    pub stop: Option<f64>,
    pub stop_source: Option<StopSource>,
}

impl Position {
    /// PnL of `quantity` units closed at `price`.
    pub fn pnl_at(&self, price: f64, quantity: f64) -> f64 {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * quantity,
            PositionSide::Short => (self.entry_price - price) * quantity,
        }
    }

    pub fn mark(&mut self, price: f64) {
        self.unrealized_pnl = self.pnl_at(price, self.size);
    }

    /// Ratchet a proposed stop: longs only raise it, shorts only lower it.
    ///
    /// Returns true if the stop moved.
    pub fn tighten_stop(&mut self, proposed: f64, source: StopSource) -> bool {
        if !proposed.is_finite() {
            return false;
        }
        let accept = match self.stop {
            None => true,
            Some(current) => self.side.is_better(proposed, current),
        };
        if accept {
            self.stop = Some(proposed);
            self.stop_source = Some(source);
        }
        accept
    }
}
