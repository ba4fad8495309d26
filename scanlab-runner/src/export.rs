//! Artifact export — JSON run report plus CSV trade tape and equity curve.
//!
//! Every persisted report carries a `schema_version` field so downstream
//! tooling can reject artifacts it does not understand.

use std::path::Path;

use anyhow::{Context, Result};
use scanlab_core::domain::{EquityPoint, Trade};

use crate::runner::RunOutcome;

/// Serialize the run report to pretty JSON.
pub fn export_report_json(outcome: &RunOutcome) -> Result<String> {
    serde_json::to_string_pretty(&outcome.report()).context("failed to serialize run report")
}

/// Export the trade tape as CSV.
///
/// Columns: ticker, side, quantity, entry_price, entry_timestamp, entry_day,
/// entry_time, exit_price, exit_timestamp, exit_day, exit_time, exit_reason,
/// pnl, pnl_percent
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for trade in trades {
        wtr.serialize(trade).context("failed to serialize trade row")?;
    }
    let bytes = wtr.into_inner().context("failed to flush trade csv")?;
    String::from_utf8(bytes).context("trade csv was not valid UTF-8")
}

/// Export the equity curve as CSV with `timestamp,equity` columns.
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])
        .context("failed to write equity header")?;
    for point in curve {
        wtr.write_record([point.timestamp.to_string(), point.equity.to_string()])
            .context("failed to write equity row")?;
    }
    let bytes = wtr.into_inner().context("failed to flush equity csv")?;
    String::from_utf8(bytes).context("equity csv was not valid UTF-8")
}

/// Write the full artifact set into `dir`, named by run id:
/// `<run_id>.report.json`, `<run_id>.trades.csv`, `<run_id>.equity.csv`.
pub fn save_artifacts(dir: &Path, outcome: &RunOutcome) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;

    let report = export_report_json(outcome)?;
    let report_path = dir.join(format!("{}.report.json", outcome.run_id));
    std::fs::write(&report_path, report)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    let trades = export_trades_csv(outcome.result.ledger.trades())?;
    let trades_path = dir.join(format!("{}.trades.csv", outcome.run_id));
    std::fs::write(&trades_path, trades)
        .with_context(|| format!("failed to write {}", trades_path.display()))?;

    let equity = export_equity_csv(outcome.result.ledger.equity_curve())?;
    let equity_path = dir.join(format!("{}.equity.csv", outcome.run_id));
    std::fs::write(&equity_path, equity)
        .with_context(|| format!("failed to write {}", equity_path.display()))?;

    Ok(())
}
