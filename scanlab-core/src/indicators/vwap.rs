//! Session-anchored volume-weighted average price.
//!
//! VWAP accumulates typical price × volume from the first bar of the session,
//! which is why the replay scheduler groups bars by (ticker, trading day):
//! feeding bars across a session boundary would poison the accumulator.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct Vwap;

impl Vwap {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = Vec::with_capacity(bars.len());
        let mut cum_pv = 0.0;
        let mut cum_vol = 0.0;

        for bar in bars {
            cum_pv += bar.typical_price() * bar.volume as f64;
            cum_vol += bar.volume as f64;
            if cum_vol > 0.0 {
                result.push(cum_pv / cum_vol);
            } else {
                result.push(f64::NAN);
            }
        }

        result
    }
}
