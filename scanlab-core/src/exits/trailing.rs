//! Price-action trailing stop.
//!
//! The stop arms only after price proves the trade out: two consecutive
//! closes favorable to the position's side. Once armed, the level trails the
//! prior bar's favorable extreme (low for shorts, high for longs) shifted
//! against the direction by the configured percent, and only ever tightens.

use super::{exit_at_level, ExitContext, ExitDecision, ExitStrategy};
use crate::domain::{Bar, Direction, ExitReason, Position};

const ARM_AFTER_FAVORABLE_CLOSES: u32 = 2;

#[derive(Debug, Clone)]
pub struct PriceActionTrailing {
    trailing_stop_percent: f64,
    consecutive_favorable: u32,
    /// Armed trailing level; None until the arming condition is met.
    level: Option<f64>,
    /// Favorable extreme of the previously evaluated bar.
    prior_extreme: Option<f64>,
}

impl PriceActionTrailing {
    pub fn new(trailing_stop_percent: f64) -> Self {
        Self {
            trailing_stop_percent,
            consecutive_favorable: 0,
            level: None,
            prior_extreme: None,
        }
    }

    /// Current armed level, if any. Exposed for diagnostics.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    fn favorable_extreme(side: Direction, bar: &Bar) -> f64 {
        match side {
            Direction::Long => bar.high,
            Direction::Short => bar.low,
        }
    }

    fn level_from_extreme(&self, side: Direction, extreme: f64) -> f64 {
        let frac = self.trailing_stop_percent / 100.0;
        match side {
            Direction::Long => extreme * (1.0 - frac),
            Direction::Short => extreme * (1.0 + frac),
        }
    }

    fn tighten(side: Direction, current: f64, candidate: f64) -> f64 {
        match side {
            // A long stop tightens upward, a short stop tightens downward.
            Direction::Long => current.max(candidate),
            Direction::Short => current.min(candidate),
        }
    }
}

impl ExitStrategy for PriceActionTrailing {
    fn name(&self) -> &'static str {
        "price_action"
    }

    fn evaluate(&mut self, position: &Position, bar: &Bar, _ctx: &ExitContext) -> ExitDecision {
        let side = position.side;

        // 1. Ratchet the armed level from the prior bar's favorable extreme.
        if let (Some(level), Some(prior)) = (self.level, self.prior_extreme) {
            let candidate = self.level_from_extreme(side, prior);
            self.level = Some(Self::tighten(side, level, candidate));
        }

        // 2. Breach check against the (possibly just tightened) level.
        if let Some(level) = self.level {
            let breached = match side {
                Direction::Long => bar.low <= level,
                Direction::Short => bar.high >= level,
            };
            if breached {
                return exit_at_level(level, bar, ExitReason::TrailingStop);
            }
        }

        // 3. Arming: count consecutive favorable closes; on the second, seed
        //    the level from this bar's own favorable extreme.
        if position.is_favorable_close(bar.close) {
            self.consecutive_favorable += 1;
            if self.level.is_none() && self.consecutive_favorable >= ARM_AFTER_FAVORABLE_CLOSES {
                let extreme = Self::favorable_extreme(side, bar);
                self.level = Some(self.level_from_extreme(side, extreme));
            }
        } else {
            self.consecutive_favorable = 0;
        }

        // 4. This bar becomes the prior bar for the next ratchet.
        self.prior_extreme = Some(Self::favorable_extreme(side, bar));

        ExitDecision::Hold
    }
}
