//! Point-in-time view over a bar store.
//!
//! Wraps a `BarStore` with a cutoff timestamp T and exposes only bars with
//! `timestamp <= T`. Everything the scheduler or a worker queries during a
//! replay step goes through a view, so lookahead is impossible by
//! construction rather than by caller discipline.

use crate::domain::Bar;
use crate::store::BarStore;
use chrono::NaiveDate;

/// Read-only slice of a store frozen at a simulated moment.
pub struct PointInTimeView<'a> {
    store: &'a dyn BarStore,
    cutoff: i64,
    handle: String,
}

impl<'a> PointInTimeView<'a> {
    pub fn new(store: &'a dyn BarStore, cutoff: i64) -> Self {
        let handle = format!("{}#as_of={}", store.handle(), cutoff);
        Self {
            store,
            cutoff,
            handle,
        }
    }

    /// Epoch-ms cutoff this view is frozen at.
    pub fn cutoff(&self) -> i64 {
        self.cutoff
    }
}

impl BarStore for PointInTimeView<'_> {
    /// Base handle plus the cutoff, so workers can apply the same bound on
    /// their side of the process boundary.
    fn handle(&self) -> &str {
        &self.handle
    }

    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.store.trading_days(start, end)
    }

    fn session(&self, ticker: &str, day: NaiveDate) -> &[Bar] {
        let full = self.store.session(ticker, day);
        // Sessions are ascending by timestamp, so the visible prefix is a
        // single split point.
        let visible = full.partition_point(|b| b.timestamp <= self.cutoff);
        &full[..visible]
    }
}
