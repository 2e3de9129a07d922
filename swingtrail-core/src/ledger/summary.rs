//! Ledger summary statistics.

use crate::domain::Trade;
use serde::{Deserialize, Serialize};

/// Gross wins divided by gross losses.
///
/// `Unbounded` is the sentinel for a record with wins and no losses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(f64),
    Unbounded,
}

impl ProfitFactor {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let gross_win: f64 = trades.iter().filter(|t| t.is_winner()).map(Trade::net_pnl).sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.is_loser())
            .map(|t| t.net_pnl().abs())
            .sum();
        if gross_loss == 0.0 {
            if gross_win > 0.0 {
                ProfitFactor::Unbounded
            } else {
                ProfitFactor::Finite(0.0)
            }
        } else {
            ProfitFactor::Finite(gross_win / gross_loss)
        }
    }

    /// Numeric view; `Unbounded` maps to `f64::INFINITY`.
    pub fn value(self) -> f64 {
        match self {
            ProfitFactor::Finite(v) => v,
            ProfitFactor::Unbounded => f64::INFINITY,
        }
    }
}

/// Summary derived from the ledger's trade history and capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub num_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub profit_factor: ProfitFactor,
    /// `(final_capital - initial_capital) / initial_capital`.
    pub total_return: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_commission: f64,
}

impl LedgerSummary {
    pub fn compute(
        trades: &[Trade],
        initial_capital: f64,
        final_capital: f64,
        total_commission: f64,
    ) -> Self {
        let wins = trades.iter().filter(|t| t.is_winner()).count();
        let losses = trades.iter().filter(|t| t.is_loser()).count();
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            wins as f64 / trades.len() as f64
        };
        let total_return = if initial_capital > 0.0 {
            (final_capital - initial_capital) / initial_capital
        } else {
            0.0
        };
        Self {
            num_trades: trades.len(),
            wins,
            losses,
            win_rate,
            profit_factor: ProfitFactor::from_trades(trades),
            total_return,
            initial_capital,
            final_capital,
            total_commission,
        }
    }
}
