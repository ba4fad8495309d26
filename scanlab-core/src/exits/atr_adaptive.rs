//! Volatility-scaled brackets: stop and target placed a multiple of the
//! session ATR away from entry.

use super::{exit_at_level, ExitContext, ExitDecision, ExitStrategy};
use crate::domain::{Bar, Direction, ExitReason, Position};

/// Stop at `entry -/+ multiplier * ATR`, target mirrored on the other side.
///
/// Levels are frozen from the first bar that arrives with a formed ATR, so
/// the bracket does not breathe with every volatility tick. Bars before the
/// ATR forms are held unconditionally.
#[derive(Debug, Clone)]
pub struct AtrAdaptive {
    atr_multiplier: f64,
    levels: Option<(f64, f64)>,
}

impl AtrAdaptive {
    pub fn new(atr_multiplier: f64) -> Self {
        Self {
            atr_multiplier,
            levels: None,
        }
    }

    fn freeze_levels(&mut self, position: &Position, atr: f64) -> (f64, f64) {
        let offset = self.atr_multiplier * atr;
        let entry = position.entry_price;
        let levels = match position.side {
            Direction::Long => (entry - offset, entry + offset),
            Direction::Short => (entry + offset, entry - offset),
        };
        self.levels = Some(levels);
        levels
    }
}

impl ExitStrategy for AtrAdaptive {
    fn name(&self) -> &'static str {
        "atr_adaptive"
    }

    fn evaluate(&mut self, position: &Position, bar: &Bar, ctx: &ExitContext) -> ExitDecision {
        let (stop, target) = match self.levels {
            Some(levels) => levels,
            None => match ctx.atr {
                Some(atr) if atr.is_finite() && atr > 0.0 => self.freeze_levels(position, atr),
                // ATR not formed yet: nothing to act on.
                _ => return ExitDecision::Hold,
            },
        };

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
