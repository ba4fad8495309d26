//! Reusable indicator primitives for pattern logic and exit templates.
//!
//! These are session-scoped: callers feed them one trading day's bars (the
//! unit at which VWAP-style accumulators reset). No indicator value at bar t
//! may depend on bars after t — the lookahead tests verify this by comparing
//! truncated and full series.

pub mod atr;
pub mod sma;
pub mod vwap;

pub use atr::Atr;
pub use sma::Sma;
pub use vwap::Vwap;

use crate::domain::Bar;

/// One value per input bar; NaN until the indicator has enough history.
pub trait Indicator {
    fn name(&self) -> &str;

    /// Bars required before the first non-NaN value.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic intraday bars from close prices for testing.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{NaiveDate, NaiveTime};
    let day = NaiveDate::from_ymd_opt(2025, 11, 7).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                ticker: "TEST".to_string(),
                timestamp: 1_730_000_000_000 + (i as i64) * 300_000,
                open,
                high,
                low,
                close,
                volume: 1_000,
                time_of_day: NaiveTime::from_hms_opt(9, 30, 0).unwrap()
                    + chrono::Duration::minutes(5 * i as i64),
                trading_day: day,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
