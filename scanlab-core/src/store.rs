//! Bar Store collaborator interface.
//!
//! The relational storage layer is out of scope; the core only needs a
//! read-only view of sessions keyed by (ticker, trading day) plus the opaque
//! data-source handle that worker processes use to run their own queries.
//! `InMemoryBarStore` backs the runner (CSV-fed) and the test suites.

use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Read-only source of OHLCV bars.
///
/// Implementations must tolerate concurrent readers: every method takes
/// `&self`, and independent replay runs may share one store.
pub trait BarStore: Sync {
    /// Opaque identifier worker processes use to query bars on their side.
    fn handle(&self) -> &str;

    /// Trading days with any data, ascending, within the inclusive range.
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;

    /// All bars for one ticker on one trading day, ascending by timestamp.
    /// Empty when the ticker has no session that day.
    fn session(&self, ticker: &str, day: NaiveDate) -> &[Bar];
}

/// In-memory bar store keyed by trading day, then ticker.
#[derive(Debug, Default)]
pub struct InMemoryBarStore {
    handle: String,
    sessions: BTreeMap<NaiveDate, BTreeMap<String, Vec<Bar>>>,
}

impl InMemoryBarStore {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            sessions: BTreeMap::new(),
        }
    }

    /// Build a store from unordered bars; sessions are sorted by timestamp.
    pub fn from_bars(handle: impl Into<String>, bars: Vec<Bar>) -> Self {
        let mut store = Self::new(handle);
        for bar in bars {
            store.push_bar(bar);
        }
        store.sort_sessions();
        store
    }

    /// Append a bar without re-sorting; call `sort_sessions` when done.
    pub fn push_bar(&mut self, bar: Bar) {
        self.sessions
            .entry(bar.trading_day)
            .or_default()
            .entry(bar.ticker.clone())
            .or_default()
            .push(bar);
    }

    /// Sort every session ascending by timestamp.
    pub fn sort_sessions(&mut self) {
        for day in self.sessions.values_mut() {
            for session in day.values_mut() {
                session.sort_by_key(|b| b.timestamp);
            }
        }
    }

    pub fn bar_count(&self) -> usize {
        self.sessions
            .values()
            .flat_map(|day| day.values())
            .map(|s| s.len())
            .sum()
    }
}

impl BarStore for InMemoryBarStore {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.sessions
            .range(start..=end)
            .filter(|(_, tickers)| tickers.values().any(|s| !s.is_empty()))
            .map(|(day, _)| *day)
            .collect()
    }

    fn session(&self, ticker: &str, day: NaiveDate) -> &[Bar] {
        self.sessions
            .get(&day)
            .and_then(|tickers| tickers.get(ticker))
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }
}
