//! Artifact export: JSON, CSV and a short Markdown report.
//!
//! A run directory holds `result.json`, `trades.csv` and `equity.csv`.
//! Directories are assembled under a staging name and renamed into place
//! only once every file is written, so a reader never sees a partial run
//! and a failed run leaves nothing behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use swingtrail_core::domain::{EquityPoint, Trade};
use swingtrail_core::ledger::ProfitFactor;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: instrument, side, size, entry_time, entry_price, exit_time,
/// exit_price, realized_pnl, realized_pnl_pct, commission, net_pnl,
/// exit_reason, is_partial, remaining_size
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "side",
        "size",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "realized_pnl",
        "realized_pnl_pct",
        "commission",
        "net_pnl",
        "exit_reason",
        "is_partial",
        "remaining_size",
    ])?;
    for t in trades {
        wtr.write_record(&[
            t.instrument.clone(),
            t.side.to_string(),
            t.size.to_string(),
            t.entry_time.format(TIMESTAMP_FMT).to_string(),
            t.entry_price.to_string(),
            t.exit_time.format(TIMESTAMP_FMT).to_string(),
            t.exit_price.to_string(),
            t.realized_pnl.to_string(),
            t.realized_pnl_pct.to_string(),
            t.commission.to_string(),
            t.net_pnl().to_string(),
            t.exit_reason.as_str().to_string(),
            t.is_partial.to_string(),
            t.remaining_size.to_string(),
        ])?;
    }
    into_string(wtr)
}

/// Columns: timestamp, capital, unrealized_pnl, equity
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "capital", "unrealized_pnl", "equity"])?;
    for p in curve {
        wtr.write_record(&[
            p.timestamp.format(TIMESTAMP_FMT).to_string(),
            p.capital.to_string(),
            p.unrealized_pnl.to_string(),
            p.equity.to_string(),
        ])?;
    }
    into_string(wtr)
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write a run's artifacts to `<output_dir>/<run_id>` and return that path.
///
/// Run ids are content hashes of the configuration, so an existing
/// directory for the same id already holds the same results and is kept.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let final_dir = output_dir.join(&result.run_id.0);
    if final_dir.exists() {
        return Ok(final_dir);
    }

    // Render everything before touching the filesystem.
    let files = [
        ("result.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&result.result.trades)?),
        ("equity.csv", export_equity_csv(&result.result.equity_curve)?),
    ];

    let staging = output_dir.join(format!(
        ".staging-{}-{}",
        result.run_id.short(),
        std::process::id()
    ));
    fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create staging dir: {}", staging.display()))?;

    let written = files
        .iter()
        .try_for_each(|(name, body)| write_atomic(&staging.join(name), body))
        .and_then(|()| {
            fs::rename(&staging, &final_dir).with_context(|| {
                format!("failed to move {} into place", final_dir.display())
            })
        });
    if let Err(e) = written {
        let _ = fs::remove_dir_all(&staging);
        // A concurrent writer with the same run id got there first.
        if final_dir.join("result.json").exists() {
            return Ok(final_dir);
        }
        return Err(e);
    }
    Ok(final_dir)
}

/// Write to `<path>.tmp`, then rename over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        anyhow::anyhow!("atomic rename to {} failed: {e}", path.display())
    })
}

/// Load a `BacktestResult` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn generate_report(result: &BacktestResult) -> String {
    let meta = &result.result.metadata;
    let summary = &result.result.summary;
    let m = &result.metrics;
    let profit_factor = match summary.profit_factor {
        ProfitFactor::Finite(v) => format!("{v:.2}"),
        ProfitFactor::Unbounded => "∞".to_string(),
    };

    let mut out = String::new();
    out.push_str(&format!(
        "# {} {} ({})\n\n",
        meta.symbol, meta.timeframe, meta.evaluator
    ));
    out.push_str(&format!("Run `{}`", result.run_id.short()));
    if result.synthetic {
        out.push_str(" (synthetic data)");
    }
    out.push_str("\n\n| Metric | Value |\n|---|---|\n");

    let rows = [
        ("Bars", meta.bars.to_string()),
        ("Void bars", meta.void_bars.to_string()),
        ("Trades", summary.num_trades.to_string()),
        ("Win rate", format!("{:.1}%", summary.win_rate * 100.0)),
        ("Profit factor", profit_factor),
        ("Total return", format!("{:.2}%", m.total_return * 100.0)),
        ("Final capital", format!("{:.2}", summary.final_capital)),
        ("Commission", format!("{:.2}", summary.total_commission)),
        ("Sharpe", format!("{:.3}", m.sharpe)),
        ("Sortino", format!("{:.3}", m.sortino)),
        ("Calmar", format!("{:.3}", m.calmar)),
        (
            "Max drawdown",
            format!(
                "{:.2} ({:.2}%)",
                m.max_drawdown.absolute,
                m.max_drawdown.pct * 100.0
            ),
        ),
        (
            "Streaks (W/L)",
            format!("{}/{}", m.streaks.max_wins, m.streaks.max_losses),
        ),
        ("Stop exits", meta.stop_exits.to_string()),
        ("Swing updates", meta.swing_updates.to_string()),
        ("Vetoed decisions", meta.vetoed_decisions.to_string()),
    ];
    for (name, value) in rows {
        out.push_str(&format!("| {name} | {value} |\n"));
    }

    if let Some(report) = &result.attribution {
        out.push_str("\n## Veto components\n\n");
        out.push_str("| Component | Evaluated | Vetoed | Allow rate |\n|---|---|---|---|\n");
        for c in &report.components {
            out.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                c.name,
                c.evaluated,
                c.vetoed,
                c.allow_rate() * 100.0
            ));
        }
    }
    out
}
