//! Simple moving average over closes.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let mut window_sum: f64 = bars[..self.period].iter().map(|b| b.close).sum();
        result[self.period - 1] = window_sum / self.period as f64;

        for i in self.period..n {
            window_sum += bars[i].close - bars[i - self.period].close;
            result[i] = window_sum / self.period as f64;
        }

        result
    }
}
