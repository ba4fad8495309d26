//! Day-by-day, bar-by-bar replay over historical sessions.
//!
//! For each trading day in range the scheduler merges the universe's
//! sessions into one (timestamp, ticker)-ordered step sequence and walks it.
//! At every step, exits on the ticker's open position are evaluated first,
//! then — once the ticker has warmed up — a point-in-time scan runs and any
//! validated signals may open a new position at the bar's close. Everything
//! the worker can observe is bounded by the step's cutoff, so the simulation
//! can never trade on information that had not yet happened.
//!
//! Determinism: same store, universe, and configuration always produce the
//! same ledger digest. All iteration orders are explicit, request ids are a
//! plain counter, and signal truncation breaks strength ties by ticker.

use super::view::PointInTimeView;
use super::warmup::SessionWarmup;
use crate::domain::{Bar, ExitReason, Position, Signal, Trade};
use crate::exits::{build_exit_strategy, ExitContext, ExitDecision, ExitStrategy, ExitStrategyConfig, TEMPLATE_ATR_ADAPTIVE};
use crate::indicators::{Atr, Indicator};
use crate::ledger::TradeLedger;
use crate::scanner::{ScanError, ScanRequest, Scanner};
use crate::store::BarStore;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Parameters of one replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub universe: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Bars a ticker must accumulate within a session before its scans run.
    pub warmup_bars: usize,
    /// Cap on validated signals acted on per step; None = unbounded.
    pub max_signals_per_step: Option<usize>,
    /// Shares per opened position.
    pub quantity: f64,
    pub initial_equity: f64,
    pub exit: ExitStrategyConfig,
    /// ATR period fed to the `atr_adaptive` exit template.
    pub atr_period: usize,
}

impl ReplayConfig {
    pub fn new(
        universe: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
        exit: ExitStrategyConfig,
    ) -> Self {
        Self {
            universe,
            start,
            end,
            warmup_bars: 30,
            max_signals_per_step: None,
            quantity: 100.0,
            initial_equity: 10_000.0,
            exit,
            atr_period: 14,
        }
    }
}

/// Failures that abort a run. Everything recoverable becomes an `Anomaly`.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay universe is empty")]
    EmptyUniverse,

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("scanner failed fatally: {0}")]
    Scanner(#[from] ScanError),
}

/// Classification of a recoverable incident observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A signal failed validation (future-dated, wrong ticker, bad strength).
    DataIntegrityViolation,
    /// A worker line could not be decoded, or request pairing broke.
    MalformedResponse,
    WorkerCrashed,
    ScanTimeout,
    /// The worker reported `success: false` for a request.
    WorkerError,
    /// The exit configuration was rejected and the fixed fallback engaged.
    ExitConfigInvalid,
    /// An exit level lay outside the triggering bar's traded range.
    GapThrough,
    /// More validated signals arrived than the per-step cap allows.
    SignalCapExceeded,
}

/// One recoverable incident, recorded instead of failing the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub day: NaiveDate,
    pub timestamp: i64,
    pub ticker: String,
    pub detail: String,
}

/// Cooperative cancellation flag shared with the run's host.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Outcome of a replay run.
#[derive(Debug)]
pub struct ReplayResult {
    pub ledger: TradeLedger,
    pub anomalies: Vec<Anomaly>,
    /// Bar steps walked across all days.
    pub steps: u64,
    pub scan_count: u64,
    pub signals_seen: u64,
    pub signals_accepted: u64,
    pub cancelled: bool,
}

/// One ticker's open exposure plus its exit state machine and the most
/// recently observed bar (the flatten price if the run is cancelled).
struct OpenSlot {
    position: Position,
    strategy: Box<dyn ExitStrategy>,
    last_close: f64,
    last_timestamp: i64,
    last_day: NaiveDate,
    last_time: NaiveTime,
}

impl OpenSlot {
    fn new(position: Position, strategy: Box<dyn ExitStrategy>, entry_bar: &Bar) -> Self {
        Self {
            position,
            strategy,
            last_close: entry_bar.close,
            last_timestamp: entry_bar.timestamp,
            last_day: entry_bar.trading_day,
            last_time: entry_bar.time_of_day,
        }
    }

    fn observe(&mut self, bar: &Bar) {
        self.position.observe_bar(bar);
        self.last_close = bar.close;
        self.last_timestamp = bar.timestamp;
        self.last_day = bar.trading_day;
        self.last_time = bar.time_of_day;
    }
}

/// Run one replay to completion (or cancellation).
pub fn run_replay(
    store: &dyn BarStore,
    scanner: &mut dyn Scanner,
    config: &ReplayConfig,
    cancel: &CancelToken,
) -> Result<ReplayResult, ReplayError> {
    let mut universe = config.universe.clone();
    universe.sort();
    universe.dedup();
    if universe.is_empty() {
        return Err(ReplayError::EmptyUniverse);
    }
    if config.start > config.end {
        return Err(ReplayError::InvalidDateRange {
            start: config.start,
            end: config.end,
        });
    }

    let wants_atr = config.exit.template == TEMPLATE_ATR_ADAPTIVE;
    let atr = Atr::new(config.atr_period);

    let mut ledger = TradeLedger::new(config.initial_equity);
    let mut anomalies: Vec<Anomaly> = Vec::new();
    let mut open: HashMap<String, OpenSlot> = HashMap::new();
    let mut warmup = SessionWarmup::new(config.warmup_bars);
    let mut next_request_id: u64 = 1;
    let mut steps: u64 = 0;
    let mut scan_count: u64 = 0;
    let mut signals_seen: u64 = 0;
    let mut signals_accepted: u64 = 0;
    let mut cancelled = false;
    let mut baseline_marked = false;
    let mut exit_config_warned = false;

    let days = store.trading_days(config.start, config.end);
    info!(
        days = days.len(),
        tickers = universe.len(),
        template = %config.exit.template,
        "starting replay"
    );

    'days: for day in days {
        // Sessions are per day; positions never survive a session boundary.
        warmup.reset();
        debug_assert!(open.is_empty());

        let sessions: Vec<(&str, &[Bar])> = universe
            .iter()
            .map(|t| (t.as_str(), store.session(t, day)))
            .filter(|(_, s)| !s.is_empty())
            .collect();

        // Merge all sessions into (timestamp, ticker)-ordered steps.
        let mut merged: Vec<(i64, usize, usize)> = Vec::new();
        for (k, (_, session)) in sessions.iter().enumerate() {
            for (i, bar) in session.iter().enumerate() {
                merged.push((bar.timestamp, k, i));
            }
        }
        merged.sort_by(|&(t1, k1, _), &(t2, k2, _)| {
            (t1, sessions[k1].0).cmp(&(t2, sessions[k2].0))
        });

        let atr_by_session: Vec<Option<Vec<f64>>> = if wants_atr {
            sessions.iter().map(|(_, s)| Some(atr.compute(s))).collect()
        } else {
            sessions.iter().map(|_| None).collect()
        };

        for (_, k, i) in merged {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'days;
            }
            steps += 1;

            let (ticker, session) = sessions[k];
            let bar = &session[i];
            let is_last_bar = i + 1 == session.len();

            if !baseline_marked {
                ledger.mark_equity(bar.timestamp);
                baseline_marked = true;
            }

            // 1. Exits on the ticker's open position run before anything
            //    else at this step.
            if let Some(slot) = open.get_mut(ticker) {
                slot.observe(bar);
                let ctx = ExitContext {
                    is_last_bar_of_session: is_last_bar,
                    atr: atr_by_session[k]
                        .as_ref()
                        .and_then(|v| v.get(i))
                        .copied()
                        .filter(|v| v.is_finite()),
                };
                let decision = slot.strategy.evaluate(&slot.position, bar, &ctx);
                match decision {
                    ExitDecision::Exit {
                        price,
                        reason,
                        gap_through,
                    } => {
                        if gap_through {
                            anomalies.push(Anomaly {
                                kind: AnomalyKind::GapThrough,
                                day,
                                timestamp: bar.timestamp,
                                ticker: ticker.to_string(),
                                detail: format!(
                                    "exit level {price} outside bar range [{}, {}]",
                                    bar.low, bar.high
                                ),
                            });
                        }
                        close_position(&mut ledger, &mut open, ticker, price, reason, bar);
                    }
                    ExitDecision::Hold if is_last_bar => {
                        // Nothing is held overnight.
                        close_position(
                            &mut ledger,
                            &mut open,
                            ticker,
                            bar.close,
                            ExitReason::SessionClose,
                            bar,
                        );
                    }
                    ExitDecision::Hold => {}
                }
            }

            // 2. Warmup gating: the bar always counts, eligibility may lag.
            let eligible = warmup.observe(ticker);
            if !eligible || is_last_bar {
                continue;
            }
            // One open position per ticker; no scan while it rides.
            if open.contains_key(ticker) {
                continue;
            }

            // 3. Point-in-time scan at this bar's cutoff.
            let view = PointInTimeView::new(store, bar.timestamp);
            let request = ScanRequest {
                request_id: next_request_id,
                data_source_handle: view.handle().to_string(),
                tickers: vec![ticker.to_string()],
            };
            next_request_id += 1;
            scan_count += 1;

            let response = match scanner.scan(&request) {
                Ok(r) => r,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    let kind = match &e {
                        ScanError::WorkerCrashed { .. } => AnomalyKind::WorkerCrashed,
                        ScanError::ScanTimeout { .. } => AnomalyKind::ScanTimeout,
                        _ => AnomalyKind::MalformedResponse,
                    };
                    warn!(ticker, error = %e, "scan step dropped");
                    anomalies.push(Anomaly {
                        kind,
                        day,
                        timestamp: bar.timestamp,
                        ticker: ticker.to_string(),
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            if response.request_id != request.request_id {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::MalformedResponse,
                    day,
                    timestamp: bar.timestamp,
                    ticker: ticker.to_string(),
                    detail: format!(
                        "response pairing broke: sent {}, got {}",
                        request.request_id, response.request_id
                    ),
                });
                continue;
            }
            if !response.success {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::WorkerError,
                    day,
                    timestamp: bar.timestamp,
                    ticker: ticker.to_string(),
                    detail: response.error.unwrap_or_else(|| "unspecified".into()),
                });
                continue;
            }

            signals_seen += response.data.len() as u64;

            // 4. Validate, order deterministically, truncate, open.
            let mut valid: Vec<Signal> = Vec::with_capacity(response.data.len());
            for signal in response.data {
                if let Some(detail) = validate_signal(&signal, ticker, bar) {
                    debug!(ticker, %detail, "signal rejected");
                    anomalies.push(Anomaly {
                        kind: AnomalyKind::DataIntegrityViolation,
                        day,
                        timestamp: bar.timestamp,
                        ticker: signal.ticker.clone(),
                        detail,
                    });
                } else {
                    valid.push(signal);
                }
            }

            valid.sort_by(|a, b| {
                b.pattern_strength
                    .partial_cmp(&a.pattern_strength)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.ticker.cmp(&b.ticker))
            });
            if let Some(cap) = config.max_signals_per_step {
                if valid.len() > cap {
                    anomalies.push(Anomaly {
                        kind: AnomalyKind::SignalCapExceeded,
                        day,
                        timestamp: bar.timestamp,
                        ticker: ticker.to_string(),
                        detail: format!("{} signals, cap {cap}", valid.len()),
                    });
                    valid.truncate(cap);
                }
            }

            let mut opened_this_step = false;
            for signal in valid {
                if open.contains_key(&signal.ticker) {
                    continue;
                }
                signals_accepted += 1;
                let (strategy, issue) = build_exit_strategy(&config.exit);
                if let Some(detail) = issue {
                    if !exit_config_warned {
                        exit_config_warned = true;
                        warn!(%detail, "exit configuration rejected, fixed fallback engaged");
                        anomalies.push(Anomaly {
                            kind: AnomalyKind::ExitConfigInvalid,
                            day,
                            timestamp: bar.timestamp,
                            ticker: ticker.to_string(),
                            detail,
                        });
                    }
                }
                let position =
                    Position::open(&signal.ticker, signal.direction, bar.close, config.quantity, bar);
                debug!(
                    ticker = %signal.ticker,
                    side = signal.direction.as_str(),
                    entry = bar.close,
                    strength = signal.pattern_strength,
                    "position opened"
                );
                open.insert(signal.ticker.clone(), OpenSlot::new(position, strategy, bar));
                opened_this_step = true;
            }
            // The curve marks every step that changed exposure: closes are
            // marked by `record_trade`, opens get one point per step here.
            if opened_this_step {
                ledger.mark_equity(bar.timestamp);
            }
        }
    }

    // Cancellation can leave positions riding mid-session; flatten them at
    // their last observed close, in ticker order.
    if cancelled && !open.is_empty() {
        let mut leftovers: Vec<String> = open.keys().cloned().collect();
        leftovers.sort();
        for ticker in leftovers {
            if let Some(mut slot) = open.remove(&ticker) {
                slot.position.close();
                let trade = Trade::from_close(
                    &slot.position,
                    slot.last_close,
                    slot.last_timestamp,
                    slot.last_day,
                    slot.last_time,
                    ExitReason::SessionClose,
                );
                ledger.record_trade(trade);
            }
        }
    }

    info!(
        steps,
        scan_count,
        trades = ledger.trade_count(),
        anomalies = anomalies.len(),
        cancelled,
        "replay finished"
    );

    Ok(ReplayResult {
        ledger,
        anomalies,
        steps,
        scan_count,
        signals_seen,
        signals_accepted,
        cancelled,
    })
}

/// Reason a signal fails validation at this step, if any.
fn validate_signal(signal: &Signal, requested_ticker: &str, bar: &Bar) -> Option<String> {
    if signal.ticker != requested_ticker {
        return Some(format!(
            "signal ticker {} does not match requested {}",
            signal.ticker, requested_ticker
        ));
    }
    if !signal.is_at_or_before(bar.trading_day, bar.time_of_day) {
        return Some(format!(
            "future-dated signal: {} {} is after step {} {}",
            signal.signal_date, signal.signal_time, bar.trading_day, bar.time_of_day
        ));
    }
    if !signal.strength_in_range() {
        return Some(format!(
            "pattern strength {} outside 0-100",
            signal.pattern_strength
        ));
    }
    None
}

fn close_position(
    ledger: &mut TradeLedger,
    open: &mut HashMap<String, OpenSlot>,
    ticker: &str,
    exit_price: f64,
    reason: ExitReason,
    bar: &Bar,
) {
    if let Some(mut slot) = open.remove(ticker) {
        slot.position.close();
        let trade = Trade::from_close(
            &slot.position,
            exit_price,
            bar.timestamp,
            bar.trading_day,
            bar.time_of_day,
            reason,
        );
        debug!(ticker, exit = exit_price, reason = %reason, pnl = trade.pnl, "position closed");
        ledger.record_trade(trade);
    }
}
