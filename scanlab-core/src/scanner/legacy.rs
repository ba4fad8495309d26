//! Legacy single-shot worker invocation.
//!
//! Without the persistent flag a module reads its parameters from the
//! environment, runs exactly once, prints one Signal[] line to stdout and
//! diagnostics to stderr, then exits — status 0 on success, non-zero on
//! failure. Used for standalone debugging of a module outside a replay.

use super::protocol::{decode_signals_line, ENV_DATA_SOURCE_HANDLE, ENV_TICKERS};
use super::ScanError;
use crate::domain::Signal;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run a module once and collect its signals.
pub fn run_once(
    program: &str,
    module_path: &Path,
    data_source_handle: &str,
    tickers: &[String],
) -> Result<Vec<Signal>, ScanError> {
    let output = Command::new(program)
        .arg(module_path)
        .env(ENV_DATA_SOURCE_HANDLE, data_source_handle)
        .env(ENV_TICKERS, tickers.join(","))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ScanError::WorkerStartupFailed {
            module: module_path.display().to_string(),
            reason: format!("spawn failed: {e}"),
        })?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!(target: "scanlab::worker", "{line}");
    }

    if !output.status.success() {
        return Err(ScanError::WorkerStartupFailed {
            module: module_path.display().to_string(),
            reason: format!("single-shot run exited with {}", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default();
    decode_signals_line(line).map_err(ScanError::MalformedResponse)
}
