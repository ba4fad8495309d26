//! Trade — a completed round trip, append-only once recorded.

use super::position::Position;
use super::signal::Direction;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    TimeExit,
    SessionClose,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop loss",
            ExitReason::TakeProfit => "take profit",
            ExitReason::TrailingStop => "trailing stop",
            ExitReason::TimeExit => "time exit",
            ExitReason::SessionClose => "session close",
        };
        f.write_str(s)
    }
}

/// A closed trade. Immutable once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub side: Direction,
    pub quantity: f64,

    pub entry_price: f64,
    pub entry_timestamp: i64,
    pub entry_day: NaiveDate,
    pub entry_time: NaiveTime,

    pub exit_price: f64,
    pub exit_timestamp: i64,
    pub exit_day: NaiveDate,
    pub exit_time: NaiveTime,

    pub exit_reason: ExitReason,
    pub pnl: f64,
    pub pnl_percent: f64,
}

impl Trade {
    /// Build the trade record for closing `position` at `exit_price`.
    pub fn from_close(
        position: &Position,
        exit_price: f64,
        exit_timestamp: i64,
        exit_day: NaiveDate,
        exit_time: NaiveTime,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            ticker: position.ticker.clone(),
            side: position.side,
            quantity: position.quantity,
            entry_price: position.entry_price,
            entry_timestamp: position.entry_timestamp,
            entry_day: position.entry_day,
            entry_time: position.entry_time,
            exit_price,
            exit_timestamp,
            exit_day,
            exit_time,
            exit_reason,
            pnl: position.pnl_at(exit_price),
            pnl_percent: position.pnl_percent_at(exit_price),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
