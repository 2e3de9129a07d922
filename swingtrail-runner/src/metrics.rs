//! Performance metrics: pure functions over a finished run.
//!
//! Equity curve and/or trade list in, scalar out. Nothing here touches the
//! simulator, the data loader or the filesystem.

use serde::{Deserialize, Serialize};
use swingtrail_core::domain::Trade;
use swingtrail_core::engine::RunResult;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: Drawdown,
    pub streaks: Streaks,
    pub trade_count: usize,
    pub periods_per_year: f64,
}

impl PerformanceMetrics {
    pub fn compute(result: &RunResult) -> Self {
        let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        let periods =
            periods_per_year(&result.metadata.timeframe).unwrap_or(DEFAULT_PERIODS_PER_YEAR);
        let total_return = result.summary.total_return;
        let max_drawdown = max_drawdown(&equity);
        Self {
            total_return,
            sharpe: sharpe_ratio(&equity, periods),
            sortino: sortino_ratio(&equity, 0.0, periods),
            calmar: calmar_ratio(total_return, &max_drawdown),
            max_drawdown,
            streaks: streaks(&result.trades),
            trade_count: result.trades.len(),
            periods_per_year: periods,
        }
    }
}

/// Used when the timeframe label cannot be parsed.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Deepest trough below the running peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// `equity − running max` at the trough (≤ 0).
    pub absolute: f64,
    /// `absolute / running max` at the same point (≤ 0, fraction).
    pub pct: f64,
}

/// Longest runs of strictly winning / strictly losing trades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub max_wins: usize,
    pub max_losses: usize,
}

// ─── Individual metric functions ────────────────────────────────────

/// Annualized Sharpe: `mean(r) / std(r) × sqrt(periods_per_year)`.
///
/// Returns 0.0 for an empty series or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Annualized Sortino: mean excess return over downside deviation.
///
/// Downside deviation is the root mean square of the negative excess
/// returns taken over the full sample. Returns 0.0 when nothing is negative.
pub fn sortino_ratio(equity_curve: &[f64], target: f64, periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.is_empty() {
        return 0.0;
    }
    let excess: Vec<f64> = returns.iter().map(|r| r - target).collect();
    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside = (downside_sq / excess.len() as f64).sqrt();
    mean_f64(&excess) / downside * periods_per_year.sqrt()
}

/// Max drawdown: most negative `equity − running max`, with the percentage
/// taken against the running max at that same bar.
///
/// 0 for a monotonically non-decreasing curve.
pub fn max_drawdown(equity_curve: &[f64]) -> Drawdown {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = Drawdown::default();
    for &eq in equity_curve {
        if !eq.is_finite() {
            continue;
        }
        peak = peak.max(eq);
        let dd = eq - peak;
        if dd < worst.absolute {
            worst = Drawdown {
                absolute: dd,
                pct: if peak > 0.0 { dd / peak } else { 0.0 },
            };
        }
    }
    worst
}

/// Calmar: total return over |max drawdown pct|. 0 when there is no drawdown.
pub fn calmar_ratio(total_return: f64, drawdown: &Drawdown) -> f64 {
    if drawdown.pct == 0.0 {
        return 0.0;
    }
    total_return / drawdown.pct.abs()
}

/// Longest winning and losing runs by net PnL. A break-even trade resets
/// both counters.
pub fn streaks(trades: &[Trade]) -> Streaks {
    let mut out = Streaks::default();
    let (mut wins, mut losses) = (0, 0);
    for t in trades {
        let pnl = t.net_pnl();
        if pnl > 0.0 {
            wins += 1;
            losses = 0;
        } else if pnl < 0.0 {
            losses += 1;
            wins = 0;
        } else {
            wins = 0;
            losses = 0;
        }
        out.max_wins = out.max_wins.max(wins);
        out.max_losses = out.max_losses.max(losses);
    }
    out
}

/// Bars per year for labels like `15m`, `1h`, `4h`, `1d`, `1w`.
///
/// Assumes a 24/7 market.
pub fn periods_per_year(timeframe: &str) -> Option<f64> {
    let tf = timeframe.trim();
    let split = tf.find(|c: char| !c.is_ascii_digit())?;
    let (n, unit) = tf.split_at(split);
    let n: f64 = if n.is_empty() { 1.0 } else { n.parse().ok()? };
    if n <= 0.0 {
        return None;
    }
    let minutes_per_year = 365.0 * 24.0 * 60.0;
    let unit_minutes = match unit {
        "m" | "min" => 1.0,
        "h" | "H" => 60.0,
        "d" | "D" => 24.0 * 60.0,
        "w" | "W" => 7.0 * 24.0 * 60.0,
        _ => return None,
    };
    Some(minutes_per_year / (n * unit_minutes))
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
