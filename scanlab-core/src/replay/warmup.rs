//! Per-session warmup gating.
//!
//! Each ticker must accumulate a minimum number of bars within the current
//! trading day before its scans may run; early-session bars carry too little
//! context for the pattern modules. Counters reset at every day boundary.

use std::collections::HashMap;

#[derive(Debug)]
pub struct SessionWarmup {
    required: usize,
    counts: HashMap<String, usize>,
}

impl SessionWarmup {
    pub fn new(required: usize) -> Self {
        Self {
            required,
            counts: HashMap::new(),
        }
    }

    /// Clear all counters at a day boundary.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Count one bar for `ticker`; returns whether scans are now allowed.
    /// The bar becomes eligible only once `required` bars precede it.
    pub fn observe(&mut self, ticker: &str) -> bool {
        let count = self.counts.entry(ticker.to_string()).or_insert(0);
        *count += 1;
        *count > self.required
    }

    pub fn is_eligible(&self, ticker: &str) -> bool {
        self.counts.get(ticker).copied().unwrap_or(0) > self.required
    }
}
