//! Time-of-day exit: flatten at or after a fixed intraday clock time.

use super::{ExitContext, ExitDecision, ExitStrategy};
use crate::domain::{Bar, ExitReason, Position};
use chrono::NaiveTime;

/// Exits at the close of the first bar whose `time_of_day` is at or past the
/// configured time. The close is a real traded price so no gap-through flag
/// can arise here.
#[derive(Debug, Clone)]
pub struct IntradayTimeExit {
    exit_time: NaiveTime,
}

impl IntradayTimeExit {
    pub fn new(exit_time: NaiveTime) -> Self {
        Self { exit_time }
    }
}

impl ExitStrategy for IntradayTimeExit {
    fn name(&self) -> &'static str {
        "intraday_time"
    }

    fn evaluate(&mut self, _position: &Position, bar: &Bar, _ctx: &ExitContext) -> ExitDecision {
        if bar.time_of_day >= self.exit_time {
            ExitDecision::Exit {
                price: bar.close,
                reason: ExitReason::TimeExit,
                gap_through: false,
            }
        } else {
            ExitDecision::Hold
        }
    }
}
