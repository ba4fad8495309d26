//! Run orchestration — wires together config, data, the worker pool, and
//! the replay scheduler.
//!
//! Two entry points:
//! - `execute_run()`: spawns the configured worker process. Used by the CLI.
//! - `run_with_scanner()`: takes any `Scanner` implementation. Used by tests
//!   and by batch mode, which reuses loaded bars across configs.

use scanlab_core::replay::{run_replay, CancelToken, ReplayError, ReplayResult};
use scanlab_core::scanner::{ScanError, Scanner, ScannerPool};
use scanlab_core::store::BarStore;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_bars, LoadError};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("worker error: {0}")]
    Worker(#[from] ScanError),

    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete outcome of a single run.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub metrics: PerformanceMetrics,
    pub result: ReplayResult,
}

/// The serializable summary of a `RunOutcome` (trades and equity are
/// exported separately as CSV).
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub schema_version: u32,
    pub run_id: &'a str,
    pub ledger_digest: String,
    pub metrics: &'a PerformanceMetrics,
    pub steps: u64,
    pub scan_count: u64,
    pub signals_seen: u64,
    pub signals_accepted: u64,
    pub cancelled: bool,
    pub anomalies: &'a [scanlab_core::replay::Anomaly],
}

impl RunOutcome {
    pub fn report(&self) -> RunReport<'_> {
        RunReport {
            schema_version: SCHEMA_VERSION,
            run_id: &self.run_id,
            ledger_digest: self.result.ledger.digest(),
            metrics: &self.metrics,
            steps: self.result.steps,
            scan_count: self.result.scan_count,
            signals_seen: self.result.signals_seen,
            signals_accepted: self.result.signals_accepted,
            cancelled: self.result.cancelled,
            anomalies: &self.result.anomalies,
        }
    }
}

/// Execute one run end to end: load bars, spawn the configured worker, and
/// replay. The worker is cleaned up whether the replay succeeds or not.
pub fn execute_run(config: &RunConfig, cancel: &CancelToken) -> Result<RunOutcome, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.data.bars_csv, config.data_handle())?;

    let mut pool = ScannerPool::initialize(config.pool_config())?;
    let outcome = run_with_scanner(&loaded.store, &mut pool, config, cancel);
    pool.cleanup();
    outcome
}

/// Run the replay over pre-loaded bars with any scanner implementation.
pub fn run_with_scanner(
    store: &dyn BarStore,
    scanner: &mut dyn Scanner,
    config: &RunConfig,
    cancel: &CancelToken,
) -> Result<RunOutcome, RunError> {
    let run_id = config.run_id();
    let result = run_replay(store, scanner, &config.replay_config(), cancel)?;
    let metrics = PerformanceMetrics::compute(&result.ledger);
    info!(
        run_id = %run_id,
        trades = metrics.trade_count,
        total_pnl = metrics.total_pnl,
        digest = %result.ledger.digest(),
        "run complete"
    );
    Ok(RunOutcome {
        run_id,
        metrics,
        result,
    })
}
