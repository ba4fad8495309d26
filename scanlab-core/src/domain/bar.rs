//! Bar — one intraday OHLCV observation.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One OHLCV bar for a ticker at a timeframe and timestamp.
///
/// `time_of_day` and `trading_day` are stored alongside the epoch-ms
/// timestamp because session boundaries drive the replay: warmup counters,
/// VWAP-style accumulators, and the end-of-session flatten all reset at
/// `trading_day` granularity. Bars are immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    /// Epoch milliseconds. Bars within a session are strictly ascending.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub time_of_day: NaiveTime,
    pub trading_day: NaiveDate,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, extremes bracket open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// True if `price` lies within this bar's traded range.
    pub fn contains_price(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    /// Typical price (HLC/3), the VWAP contribution of this bar.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
