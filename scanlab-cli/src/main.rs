//! ScanLab CLI — replay runs and direct module invocation.
//!
//! Commands:
//! - `run` — execute a replay from a TOML config file and save artifacts
//! - `scan-once` — invoke a scanning module in legacy single-shot mode and
//!   print its signals (standalone module debugging)
//!
//! The binary installs no signal handler. If the process is killed
//! mid-run, the kernel closes the worker's stdin and a conforming worker
//! exits on the EOF; a worker that ignores EOF can outlive the host. For a
//! graceful mid-run stop, embed `run_with_scanner` and trip its
//! `CancelToken` instead of signalling the process.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scanlab_core::replay::CancelToken;
use scanlab_core::scanner::legacy;
use scanlab_runner::{execute_run, save_artifacts, RunConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "scanlab",
    about = "ScanLab CLI — point-in-time intraday replay engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a replay from a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Invoke a scanning module once in legacy single-shot mode.
    ScanOnce {
        /// Program hosting the module (a script runtime).
        #[arg(long)]
        program: String,

        /// Path of the scanning module.
        #[arg(long)]
        module: PathBuf,

        /// Data-source handle passed via the environment.
        #[arg(long)]
        handle: String,

        /// Tickers to scan.
        #[arg(required = true)]
        tickers: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, out } => cmd_run(&config, &out),
        Commands::ScanOnce {
            program,
            module,
            handle,
            tickers,
        } => cmd_scan_once(&program, &module, &handle, &tickers),
    }
}

fn cmd_run(config_path: &Path, out: &Path) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let outcome = execute_run(&config, &CancelToken::new())?;
    save_artifacts(out, &outcome)?;

    info!(
        run_id = %outcome.run_id,
        trades = outcome.metrics.trade_count,
        win_rate = outcome.metrics.win_rate,
        total_pnl = outcome.metrics.total_pnl,
        max_drawdown = outcome.metrics.max_drawdown,
        cancelled = outcome.result.cancelled,
        out = %out.display(),
        "artifacts saved"
    );
    println!("{}", serde_json::to_string_pretty(&outcome.report())?);
    Ok(())
}

fn cmd_scan_once(program: &str, module: &Path, handle: &str, tickers: &[String]) -> Result<()> {
    if tickers.is_empty() {
        bail!("at least one ticker is required");
    }
    let signals = legacy::run_once(program, module, handle, tickers)
        .with_context(|| format!("running module {}", module.display()))?;
    println!("{}", serde_json::to_string_pretty(&signals)?);
    Ok(())
}
