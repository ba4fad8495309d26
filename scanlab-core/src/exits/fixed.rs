//! Fixed percent stop/target brackets anchored at the entry price.

use super::{exit_at_level, ExitContext, ExitDecision, ExitStrategy};
use crate::domain::{Bar, Direction, ExitReason, Position};

/// Static stop-loss and take-profit levels, both percentages of entry.
///
/// When one bar's range spans both levels the stop wins: intra-bar order is
/// unknowable from OHLC, so the conservative reading is assumed.
#[derive(Debug, Clone)]
pub struct FixedExit {
    stop_loss_percent: f64,
    take_profit_percent: f64,
}

impl FixedExit {
    pub fn new(stop_loss_percent: f64, take_profit_percent: f64) -> Self {
        Self {
            stop_loss_percent,
            take_profit_percent,
        }
    }

    fn levels(&self, position: &Position) -> (f64, f64) {
        let entry = position.entry_price;
        let stop_frac = self.stop_loss_percent / 100.0;
        let target_frac = self.take_profit_percent / 100.0;
        match position.side {
            Direction::Long => (entry * (1.0 - stop_frac), entry * (1.0 + target_frac)),
            Direction::Short => (entry * (1.0 + stop_frac), entry * (1.0 - target_frac)),
        }
    }
}

impl ExitStrategy for FixedExit {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn evaluate(&mut self, position: &Position, bar: &Bar, _ctx: &ExitContext) -> ExitDecision {
        let (stop, target) = self.levels(position);

        let stop_hit = match position.side {
            Direction::Long => bar.low <= stop,
            Direction::Short => bar.high >= stop,
        };
        if stop_hit {
            return exit_at_level(stop, bar, ExitReason::StopLoss);
        }

        let target_hit = match position.side {
            Direction::Long => bar.high >= target,
            Direction::Short => bar.low <= target,
        };
        if target_hit {
            return exit_at_level(target, bar, ExitReason::TakeProfit);
        }

        ExitDecision::Hold
    }
}
