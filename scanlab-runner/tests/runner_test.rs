//! End-to-end runner tests: CSV in, artifacts out, with an in-process
//! scanner standing in for the worker process.

use chrono::{NaiveDate, NaiveTime};
use scanlab_core::domain::{Direction, Signal};
use scanlab_core::replay::CancelToken;
use scanlab_core::scanner::{ScanError, ScanRequest, ScanResponse, Scanner};
use scanlab_runner::{load_bars, run_with_scanner, save_artifacts, RunConfig};
use std::collections::BTreeMap;
use std::io::Write;

fn config_toml(bars_csv: &str) -> String {
    format!(
        r#"
[data]
bars_csv = "{bars_csv}"
handle = "bars.db"

[worker]
program = "node"
module = "scanners/gap_fade.js"

[replay]
universe = ["CELU"]
start = "2025-11-07"
end = "2025-11-07"
warmup_bars = 3
quantity = 100.0

[exit]
template = "fixed"
stopLossPercent = 2.0
takeProfitPercent = 4.0
"#
    )
}

/// Ten flat one-minute bars for CELU on 2025-11-07.
fn write_bars_csv() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "ticker,timestamp,open,high,low,close,volume,time_of_day,trading_day"
    )
    .unwrap();
    for m in 0..10i64 {
        writeln!(
            file,
            "CELU,{},25.75,25.80,25.70,25.75,5000,09:{:02}:00,2025-11-07",
            1_730_000_000_000 + m * 60_000,
            30 + m
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

struct OneShotScanner {
    fired: bool,
}

impl Scanner for OneShotScanner {
    fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
        let data = if self.fired {
            vec![]
        } else {
            self.fired = true;
            vec![Signal {
                ticker: "CELU".into(),
                signal_date: NaiveDate::from_ymd_opt(2025, 11, 7).unwrap(),
                signal_time: NaiveTime::from_hms_opt(9, 33, 0).unwrap(),
                pattern_strength: 85.0,
                direction: Direction::Long,
                metrics: BTreeMap::new(),
            }]
        };
        Ok(ScanResponse {
            request_id: request.request_id,
            success: true,
            data,
            error: None,
        })
    }
}

#[test]
fn csv_to_artifacts_round_trip() {
    let bars = write_bars_csv();
    let config =
        RunConfig::from_toml_str(&config_toml(&bars.path().display().to_string())).unwrap();

    let loaded = load_bars(&config.data.bars_csv, config.data_handle()).unwrap();
    assert_eq!(loaded.store.bar_count(), 10);

    let mut scanner = OneShotScanner { fired: false };
    let outcome =
        run_with_scanner(&loaded.store, &mut scanner, &config, &CancelToken::new()).unwrap();

    // Flat tape: the position opens on the first eligible bar and rides to
    // the session-close flatten at the same price.
    assert_eq!(outcome.metrics.trade_count, 1);
    assert_eq!(outcome.metrics.total_pnl, 0.0);
    assert!(!outcome.result.cancelled);

    let out = tempfile::tempdir().unwrap();
    save_artifacts(out.path(), &outcome).unwrap();

    let report_path = out.path().join(format!("{}.report.json", outcome.run_id));
    let trades_path = out.path().join(format!("{}.trades.csv", outcome.run_id));
    let equity_path = out.path().join(format!("{}.equity.csv", outcome.run_id));
    assert!(report_path.exists());
    assert!(trades_path.exists());
    assert!(equity_path.exists());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["run_id"], outcome.run_id.as_str());
    assert_eq!(report["metrics"]["trade_count"], 1);
    assert_eq!(
        report["ledger_digest"].as_str().unwrap(),
        outcome.result.ledger.digest()
    );

    let trades_csv = std::fs::read_to_string(trades_path).unwrap();
    assert!(trades_csv.contains("CELU"));
    assert!(trades_csv.contains("session_close"));

    let equity_csv = std::fs::read_to_string(equity_path).unwrap();
    assert!(equity_csv.starts_with("timestamp,equity"));
}

#[test]
fn identical_configs_reproduce_the_same_digest() {
    let bars = write_bars_csv();
    let config =
        RunConfig::from_toml_str(&config_toml(&bars.path().display().to_string())).unwrap();
    let loaded = load_bars(&config.data.bars_csv, config.data_handle()).unwrap();

    let run = || {
        let mut scanner = OneShotScanner { fired: false };
        run_with_scanner(&loaded.store, &mut scanner, &config, &CancelToken::new())
            .unwrap()
            .result
            .ledger
            .digest()
    };
    assert_eq!(run(), run());
}
