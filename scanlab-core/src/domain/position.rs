//! Position — one open or closed exposure on a single ticker.

use super::bar::Bar;
use super::signal::Direction;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Lifecycle of a position: OPEN is mutated once per bar, CLOSED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A tracked position for one ticker.
///
/// Invariants enforced here:
/// - `highest_price_since_entry` is non-decreasing while OPEN
/// - `lowest_price_since_entry` is non-increasing while OPEN
/// - a CLOSED position is never mutated again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub side: Direction,
    pub entry_price: f64,
    pub entry_timestamp: i64,
    pub entry_day: NaiveDate,
    pub entry_time: NaiveTime,
    pub quantity: f64,
    pub highest_price_since_entry: f64,
    pub lowest_price_since_entry: f64,
    pub status: PositionStatus,
}

impl Position {
    /// Open a position from the bar that carried its accepted signal.
    pub fn open(ticker: &str, side: Direction, entry_price: f64, quantity: f64, bar: &Bar) -> Self {
        Self {
            ticker: ticker.to_string(),
            side,
            entry_price,
            entry_timestamp: bar.timestamp,
            entry_day: bar.trading_day,
            entry_time: bar.time_of_day,
            quantity,
            highest_price_since_entry: entry_price,
            lowest_price_since_entry: entry_price,
            status: PositionStatus::Open,
        }
    }

    /// Fold one bar's range into the excursion extremes.
    ///
    /// Called once per subsequent bar while OPEN, before exit evaluation.
    pub fn observe_bar(&mut self, bar: &Bar) {
        debug_assert_eq!(self.status, PositionStatus::Open);
        if bar.high > self.highest_price_since_entry {
            self.highest_price_since_entry = bar.high;
        }
        if bar.low < self.lowest_price_since_entry {
            self.lowest_price_since_entry = bar.low;
        }
    }

    pub fn close(&mut self) {
        self.status = PositionStatus::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Signed PnL for exiting the full quantity at `exit_price`.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        match self.side {
            Direction::Long => (exit_price - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - exit_price) * self.quantity,
        }
    }

    /// PnL as a percentage of entry price, positive when favorable.
    pub fn pnl_percent_at(&self, exit_price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        let raw = (exit_price - self.entry_price) / self.entry_price * 100.0;
        match self.side {
            Direction::Long => raw,
            Direction::Short => -raw,
        }
    }

    /// True if `close` is favorable relative to entry for this side.
    pub fn is_favorable_close(&self, close: f64) -> bool {
        match self.side {
            Direction::Long => close > self.entry_price,
            Direction::Short => close < self.entry_price,
        }
    }
}
