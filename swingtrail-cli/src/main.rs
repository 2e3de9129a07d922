//! swingtrail CLI: run, sweep and validate commands.
//!
//! Commands:
//! - `run`: one backtest from a TOML config (plus optional override)
//! - `sweep`: one backtest per override file, in parallel
//! - `validate`: check a config without running it
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for phase
//! changes, swing updates and veto decisions.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use swingtrail_core::ledger::ProfitFactor;
use swingtrail_runner::{
    run_batch, run_from_source, save_artifacts, BacktestResult, BarSource, RunConfig, RunOutcome,
};

#[derive(Parser)]
#[command(
    name = "swingtrail",
    about = "swingtrail: deterministic swing-exit backtest simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// TOML file deep-merged over the config.
        #[arg(long = "override")]
        overlay: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        /// Write result.json, trades.csv and equity.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full result as JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run one backtest per override file against the same bars.
    Sweep {
        /// Base TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override files; each produces one run.
        #[arg(long = "override", required = true)]
        overlays: Vec<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Parse and validate a config, print its run id.
    Validate {
        #[arg(long)]
        config: PathBuf,

        #[arg(long = "override")]
        overlay: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// CSV with timestamp,open,high,low,close,volume columns.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate this many synthetic bars instead of reading data.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic bars.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl SourceArgs {
    fn to_source(&self) -> Result<BarSource> {
        match (&self.data, self.synthetic) {
            (Some(path), None) => Ok(BarSource::Csv(path.clone())),
            (None, Some(bars)) => Ok(BarSource::Synthetic {
                bars,
                seed: self.seed,
            }),
            _ => bail!("exactly one of --data or --synthetic is required"),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            overlay,
            source,
            output_dir,
            json,
        } => run_cmd(&config, overlay.as_deref(), &source, output_dir.as_deref(), json),
        Commands::Sweep {
            config,
            overlays,
            source,
            output_dir,
        } => sweep_cmd(&config, &overlays, &source, output_dir.as_deref()),
        Commands::Validate { config, overlay } => validate_cmd(&config, overlay.as_deref()),
    }
}

fn load_config(path: &Path, overlay: Option<&Path>) -> Result<RunConfig> {
    let config = match overlay {
        Some(o) => RunConfig::merge_files(path, o),
        None => RunConfig::from_file(path),
    }
    .with_context(|| format!("failed to load config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn run_cmd(
    config_path: &Path,
    overlay: Option<&Path>,
    source: &SourceArgs,
    output_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, overlay)?;
    let result = match run_from_source(&config, &source.to_source()?) {
        RunOutcome::Completed(result) => result,
        RunOutcome::Failed { error, .. } => return Err(error).context("backtest failed"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&*result)?);
    } else {
        print_summary(&result);
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&result, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    config_path: &Path,
    overlays: &[PathBuf],
    source: &SourceArgs,
    output_dir: Option<&Path>,
) -> Result<()> {
    let source = source.to_source()?;
    let mut configs = Vec::with_capacity(overlays.len());
    for overlay in overlays {
        configs.push(
            RunConfig::merge_files(config_path, overlay)
                .with_context(|| format!("failed to load override {}", overlay.display()))?,
        );
    }
    info!("sweeping {} configurations", configs.len());

    let outcomes = run_batch(&configs, &source);
    let mut failures = 0;

    println!(
        "{:<28} {:>12} {:>7} {:>10} {:>8} {:>10}",
        "override", "run", "trades", "return", "sharpe", "max dd"
    );
    for (overlay, outcome) in overlays.iter().zip(&outcomes) {
        let name = overlay
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match outcome {
            RunOutcome::Completed(result) => {
                println!(
                    "{:<28} {:>12} {:>7} {:>9.2}% {:>8.3} {:>9.2}%",
                    name,
                    result.run_id.short(),
                    result.metrics.trade_count,
                    result.metrics.total_return * 100.0,
                    result.metrics.sharpe,
                    result.metrics.max_drawdown.pct * 100.0,
                );
                if let Some(dir) = output_dir {
                    save_artifacts(result, dir)?;
                }
            }
            RunOutcome::Failed { error, .. } => {
                failures += 1;
                println!("{name:<28} FAILED: {error}");
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures} of {} runs failed", outcomes.len());
        std::process::exit(1);
    }
    Ok(())
}

fn validate_cmd(config_path: &Path, overlay: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, overlay)?;
    println!("ok: {}", config.run_id()?);
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let meta = &result.result.metadata;
    let summary = &result.result.summary;
    let m = &result.metrics;

    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", result.run_id.short());
    println!("Symbol:         {} {}", meta.symbol, meta.timeframe);
    println!("Evaluator:      {}", meta.evaluator);
    println!(
        "Bars:           {} ({} warmup, {} void)",
        meta.bars, meta.warmup_bars, meta.void_bars
    );
    println!("Trades:         {}", summary.num_trades);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Final Capital:  {:.2}", summary.final_capital);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!(
        "Max Drawdown:   {:.2} ({:.2}%)",
        m.max_drawdown.absolute,
        m.max_drawdown.pct * 100.0
    );
    println!("Win Rate:       {:.1}%", summary.win_rate * 100.0);
    match summary.profit_factor {
        ProfitFactor::Finite(v) => println!("Profit Factor:  {v:.2}"),
        ProfitFactor::Unbounded => println!("Profit Factor:  unbounded"),
    }
    println!("Max Consec Win: {}", m.streaks.max_wins);
    println!("Max Consec Loss: {}", m.streaks.max_losses);
    println!("Stop Exits:     {}", meta.stop_exits);
    println!("Swing Updates:  {}", meta.swing_updates);
    if let Some(report) = &result.attribution {
        println!(
            "Vetoed:         {} of {} opening decisions",
            report.decisions_vetoed, report.decisions_seen
        );
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
