//! Signal — a candidate trade opportunity proposed by a scanning module.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trade direction of a signal or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

/// A signal emitted by a scanning module.
///
/// Ephemeral: validated by the scheduler, then either promoted to a
/// position-open event or dropped. `metrics` is an opaque payload the module
/// attaches for downstream analytics; a `BTreeMap` keeps its serialization
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    pub signal_date: NaiveDate,
    pub signal_time: NaiveTime,
    /// Module-assigned confidence, 0–100.
    pub pattern_strength: f64,
    pub direction: Direction,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl Signal {
    /// True if the signal's stamp is at or before the given simulated moment.
    ///
    /// The comparison is on (trading day, time of day) pairs — the same clock
    /// the replay scheduler advances — so a future-dated signal can never
    /// slip through on a timezone technicality.
    pub fn is_at_or_before(&self, day: NaiveDate, time: NaiveTime) -> bool {
        (self.signal_date, self.signal_time) <= (day, time)
    }

    /// True if `pattern_strength` is a finite value within 0–100.
    pub fn strength_in_range(&self) -> bool {
        self.pattern_strength.is_finite()
            && self.pattern_strength >= 0.0
            && self.pattern_strength <= 100.0
    }
}
