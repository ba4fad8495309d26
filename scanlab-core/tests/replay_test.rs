//! End-to-end replay scheduler tests with an in-process mock scanner.
//!
//! The mock implements the `Scanner` seam directly, so these tests exercise
//! point-in-time gating, warmup, validation, truncation, and determinism
//! without spawning worker processes.

use chrono::{NaiveDate, NaiveTime};
use scanlab_core::domain::{Bar, Direction, ExitReason, Signal};
use scanlab_core::exits::ExitStrategyConfig;
use scanlab_core::replay::{run_replay, AnomalyKind, CancelToken, ReplayConfig, ReplayError};
use scanlab_core::scanner::{ScanError, ScanRequest, ScanResponse, Scanner};
use scanlab_core::store::InMemoryBarStore;
use std::collections::BTreeMap;

const DAY: &str = "2025-11-07";

fn day() -> NaiveDate {
    DAY.parse().unwrap()
}

fn minute_time(minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap() + chrono::Duration::minutes(minute as i64)
}

fn bar(ticker: &str, minute: u32, close: f64) -> Bar {
    Bar {
        ticker: ticker.into(),
        timestamp: 1_730_000_000_000 + (minute as i64) * 60_000,
        open: close,
        high: close + 0.25,
        low: close - 0.25,
        close,
        volume: 10_000,
        time_of_day: minute_time(minute),
        trading_day: day(),
    }
}

/// Flat session: n bars at a constant close, so fixed brackets never fire
/// and every opened position rides to the session-close flatten.
fn flat_session(ticker: &str, n: u32, close: f64) -> Vec<Bar> {
    (0..n).map(|m| bar(ticker, m, close)).collect()
}

fn signal(ticker: &str, minute: u32, strength: f64, direction: Direction) -> Signal {
    Signal {
        ticker: ticker.into(),
        signal_date: day(),
        signal_time: minute_time(minute),
        pattern_strength: strength,
        direction,
        metrics: BTreeMap::new(),
    }
}

/// Scripted scanner: emits a fixed signal batch on the nth scan request,
/// empty responses otherwise.
struct ScriptedScanner {
    fire_on_scan: u64,
    payload: Vec<Signal>,
    scans: u64,
    handles_seen: Vec<String>,
}

impl ScriptedScanner {
    fn new(fire_on_scan: u64, payload: Vec<Signal>) -> Self {
        Self {
            fire_on_scan,
            payload,
            scans: 0,
            handles_seen: Vec::new(),
        }
    }
}

impl Scanner for ScriptedScanner {
    fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
        self.scans += 1;
        self.handles_seen.push(request.data_source_handle.clone());
        let data = if self.scans == self.fire_on_scan {
            self.payload.clone()
        } else {
            vec![]
        };
        Ok(ScanResponse {
            request_id: request.request_id,
            success: true,
            data,
            error: None,
        })
    }
}

fn base_config(universe: &[&str]) -> ReplayConfig {
    let mut config = ReplayConfig::new(
        universe.iter().map(|s| s.to_string()).collect(),
        day(),
        day(),
        ExitStrategyConfig::fixed(2.0, 4.0),
    );
    config.warmup_bars = 3;
    config
}

#[test]
fn warmup_gates_scans() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 10, 100.0));
    let mut scanner = ScriptedScanner::new(u64::MAX, vec![]);
    let config = base_config(&["QQQ"]);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    // 10 bars, 3 warmup, last bar never scans: bars 4..=9 minus the last = 6.
    assert_eq!(result.steps, 10);
    assert_eq!(result.scan_count, 6);
}

#[test]
fn scan_handles_carry_the_step_cutoff() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 6, 100.0));
    let mut scanner = ScriptedScanner::new(u64::MAX, vec![]);
    let config = base_config(&["QQQ"]);

    run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    // First eligible scan is the 4th bar (minute 3).
    assert_eq!(
        scanner.handles_seen[0],
        format!("bars.db#as_of={}", 1_730_000_000_000i64 + 3 * 60_000)
    );
    // Cutoffs advance strictly with the steps.
    let cutoffs: Vec<&str> = scanner
        .handles_seen
        .iter()
        .map(|h| h.rsplit('=').next().unwrap())
        .collect();
    let mut sorted = cutoffs.clone();
    sorted.sort();
    assert_eq!(cutoffs, sorted);
}

#[test]
fn future_dated_signal_is_a_data_integrity_violation() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 8, 100.0));
    // Signal stamped at minute 7, delivered on the scan at minute 4.
    let mut scanner = ScriptedScanner::new(2, vec![signal("QQQ", 7, 80.0, Direction::Long)]);
    let config = base_config(&["QQQ"]);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    assert_eq!(result.signals_seen, 1);
    assert_eq!(result.signals_accepted, 0);
    assert_eq!(result.ledger.trade_count(), 0);
    assert_eq!(result.anomalies.len(), 1);
    assert_eq!(result.anomalies[0].kind, AnomalyKind::DataIntegrityViolation);
    assert!(result.anomalies[0].detail.contains("future-dated"));
}

#[test]
fn out_of_range_strength_is_rejected() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 8, 100.0));
    let mut scanner = ScriptedScanner::new(1, vec![signal("QQQ", 0, 140.0, Direction::Long)]);
    let config = base_config(&["QQQ"]);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    assert_eq!(result.signals_accepted, 0);
    assert_eq!(result.anomalies[0].kind, AnomalyKind::DataIntegrityViolation);
}

#[test]
fn accepted_signal_opens_at_bar_close_and_flattens_at_session_close() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 8, 100.0));
    // First eligible scan is the 4th bar (minute 3); signal stamped there.
    let mut scanner = ScriptedScanner::new(1, vec![signal("QQQ", 3, 80.0, Direction::Long)]);
    let config = base_config(&["QQQ"]);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    assert_eq!(result.signals_accepted, 1);
    assert_eq!(result.ledger.trade_count(), 1);
    let trade = &result.ledger.trades()[0];
    assert_eq!(trade.entry_price, 100.0);
    assert_eq!(trade.entry_time, minute_time(3));
    assert_eq!(trade.exit_reason, ExitReason::SessionClose);
    assert_eq!(trade.exit_time, minute_time(7));
}

#[test]
fn equity_curve_marks_the_bar_that_opens_a_position() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 8, 100.0));
    let mut scanner = ScriptedScanner::new(1, vec![signal("QQQ", 3, 80.0, Direction::Long)]);
    let config = base_config(&["QQQ"]);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    let trade = &result.ledger.trades()[0];
    let curve = result.ledger.equity_curve();
    // No cash moves at entry, so the point carries the pre-trade equity.
    let entry_point = curve
        .iter()
        .find(|p| p.timestamp == trade.entry_timestamp)
        .expect("curve point at the entry bar");
    assert_eq!(entry_point.equity, config.initial_equity);
    // Exactly one open and one close on a flat tape: baseline, entry, exit.
    assert_eq!(curve.len(), 3);
    assert_eq!(curve[2].timestamp, trade.exit_timestamp);
}

#[test]
fn one_open_position_per_ticker() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 12, 100.0));
    // Fire the same ticker twice; the second lands while the first rides.
    struct DoubleFire {
        scans: u64,
    }
    impl Scanner for DoubleFire {
        fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
            self.scans += 1;
            Ok(ScanResponse {
                request_id: request.request_id,
                success: true,
                data: vec![signal("QQQ", 3, 80.0, Direction::Long)],
                error: None,
            })
        }
    }
    let mut scanner = DoubleFire { scans: 0 };
    let config = base_config(&["QQQ"]);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    // The first eligible scan opens; no further scans run on that ticker
    // while the position is open, so exactly one trade exists.
    assert_eq!(scanner.scans, 1);
    assert_eq!(result.ledger.trade_count(), 1);
}

#[test]
fn truncation_keeps_strongest_then_ticker_ascending() {
    // Two tickers trading in lockstep; the scan on AAA returns three signals
    // for AAA with different strengths plus one for an unrequested ticker.
    let mut bars = flat_session("AAA", 8, 50.0);
    bars.extend(flat_session("BBB", 8, 60.0));
    let store = InMemoryBarStore::from_bars("bars.db", bars);

    let payload = vec![
        signal("AAA", 3, 70.0, Direction::Long),
        signal("AAA", 3, 90.0, Direction::Short),
        signal("BBB", 3, 95.0, Direction::Long), // wrong ticker for this scan
    ];
    let mut scanner = ScriptedScanner::new(1, payload);
    let mut config = base_config(&["AAA", "BBB"]);
    config.max_signals_per_step = Some(1);

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    // BBB's signal is a violation (unrequested ticker); of AAA's two, only
    // the strongest survives the cap.
    assert_eq!(result.signals_accepted, 1);
    let trade = &result.ledger.trades()[0];
    assert_eq!(trade.ticker, "AAA");
    assert_eq!(trade.side, Direction::Short);
    assert!(result
        .anomalies
        .iter()
        .any(|a| a.kind == AnomalyKind::SignalCapExceeded));
    assert!(result
        .anomalies
        .iter()
        .any(|a| a.kind == AnomalyKind::DataIntegrityViolation && a.ticker == "BBB"));
}

#[test]
fn identical_runs_produce_identical_digests() {
    let run = || {
        let mut bars = flat_session("AAA", 10, 50.0);
        bars.extend(flat_session("BBB", 10, 60.0));
        let store = InMemoryBarStore::from_bars("bars.db", bars);
        let payload = vec![
            signal("AAA", 3, 80.0, Direction::Long),
            signal("AAA", 3, 60.0, Direction::Short),
        ];
        let mut scanner = ScriptedScanner::new(1, payload);
        let config = base_config(&["AAA", "BBB"]);
        run_replay(&store, &mut scanner, &config, &CancelToken::new())
            .unwrap()
            .ledger
            .digest()
    };
    assert_eq!(run(), run());
}

#[test]
fn worker_error_response_is_recorded_and_skipped() {
    struct FailingScanner;
    impl Scanner for FailingScanner {
        fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
            Ok(ScanResponse {
                request_id: request.request_id,
                success: false,
                data: vec![],
                error: Some("module threw".into()),
            })
        }
    }
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 6, 100.0));
    let config = base_config(&["QQQ"]);
    let result = run_replay(&store, &mut FailingScanner, &config, &CancelToken::new()).unwrap();

    assert_eq!(result.ledger.trade_count(), 0);
    assert!(result
        .anomalies
        .iter()
        .all(|a| a.kind == AnomalyKind::WorkerError));
    assert!(!result.anomalies.is_empty());
}

#[test]
fn fatal_scanner_error_aborts_the_run() {
    struct ExhaustedScanner;
    impl Scanner for ExhaustedScanner {
        fn scan(&mut self, _request: &ScanRequest) -> Result<ScanResponse, ScanError> {
            Err(ScanError::RespawnExhausted { respawns: 1 })
        }
    }
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 6, 100.0));
    let config = base_config(&["QQQ"]);
    let err = run_replay(&store, &mut ExhaustedScanner, &config, &CancelToken::new()).unwrap_err();
    assert!(matches!(
        err,
        ReplayError::Scanner(ScanError::RespawnExhausted { .. })
    ));
}

#[test]
fn non_fatal_scanner_error_drops_only_that_step() {
    struct FlakyScanner {
        scans: u64,
    }
    impl Scanner for FlakyScanner {
        fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
            self.scans += 1;
            if self.scans == 1 {
                Err(ScanError::ScanTimeout {
                    request_id: request.request_id,
                    timeout_ms: 30_000,
                })
            } else {
                Ok(ScanResponse {
                    request_id: request.request_id,
                    success: true,
                    data: vec![],
                    error: None,
                })
            }
        }
    }
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 8, 100.0));
    let config = base_config(&["QQQ"]);
    let mut scanner = FlakyScanner { scans: 0 };
    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    assert!(scanner.scans > 1, "run continued past the timeout");
    assert_eq!(
        result
            .anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::ScanTimeout)
            .count(),
        1
    );
}

#[test]
fn cancellation_stops_the_run_and_flattens() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 20, 100.0));
    // Open a position early, then cancel from inside the scanner.
    struct CancellingScanner {
        token: CancelToken,
        scans: u64,
    }
    impl Scanner for CancellingScanner {
        fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
            self.scans += 1;
            let data = if self.scans == 1 {
                vec![signal("QQQ", 3, 80.0, Direction::Long)]
            } else {
                vec![]
            };
            if self.scans == 1 {
                self.token.cancel();
            }
            Ok(ScanResponse {
                request_id: request.request_id,
                success: true,
                data,
                error: None,
            })
        }
    }

    let token = CancelToken::new();
    let mut scanner = CancellingScanner {
        token: token.clone(),
        scans: 0,
    };
    let config = base_config(&["QQQ"]);
    let result = run_replay(&store, &mut scanner, &config, &token).unwrap();

    assert!(result.cancelled);
    assert!(result.steps < 20, "run stopped before the session ended");
    // The riding position was flattened, not dropped.
    assert_eq!(result.ledger.trade_count(), 1);
    assert_eq!(
        result.ledger.trades()[0].exit_reason,
        ExitReason::SessionClose
    );
}

#[test]
fn exit_config_fallback_is_reported_once() {
    let store = InMemoryBarStore::from_bars("bars.db", flat_session("QQQ", 8, 100.0));
    let mut scanner = ScriptedScanner::new(1, vec![signal("QQQ", 3, 80.0, Direction::Long)]);
    let mut config = base_config(&["QQQ"]);
    config.exit = ExitStrategyConfig {
        template: "not_a_template".into(),
        stop_loss_percent: None,
        take_profit_percent: None,
        trailing_stop_percent: None,
        exit_time: None,
        atr_multiplier: None,
    };

    let result = run_replay(&store, &mut scanner, &config, &CancelToken::new()).unwrap();

    assert_eq!(
        result
            .anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::ExitConfigInvalid)
            .count(),
        1
    );
    // The run still trades under the fallback brackets.
    assert_eq!(result.ledger.trade_count(), 1);
}
