//! Equity curve points.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One point per processed bar. The curve is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    /// Initial capital plus realized PnL minus commissions.
    pub capital: f64,
    pub unrealized_pnl: f64,
    /// `capital + unrealized_pnl`.
    pub equity: f64,
}
