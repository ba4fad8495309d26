//! Exit strategy state machine.
//!
//! One boxed `ExitStrategy` instance lives alongside each OPEN position and
//! is evaluated once per subsequent bar, in timestamp order, before the next
//! signal is considered. Strategies return decisions; the scheduler closes
//! the position and writes the ledger. Two engine-level rules apply on top
//! of every template:
//!
//! - session-close flatten: a position still OPEN at the last bar of its
//!   trading day exits at that bar's close, reason "session close"
//! - gap-through pricing: a configured stop/target level outside the bar's
//!   range is reported as the exit price (accepted slippage assumption)

pub mod atr_adaptive;
pub mod config;
pub mod fixed;
pub mod time_exit;
pub mod trailing;

pub use atr_adaptive::AtrAdaptive;
pub use config::{
    ExitStrategyConfig, FALLBACK_STOP_LOSS_PERCENT, FALLBACK_TAKE_PROFIT_PERCENT,
    TEMPLATE_ATR_ADAPTIVE, TEMPLATE_FIXED, TEMPLATE_INTRADAY_TIME, TEMPLATE_PRICE_ACTION,
};
pub use fixed::FixedExit;
pub use time_exit::IntradayTimeExit;
pub use trailing::PriceActionTrailing;

use crate::domain::{Bar, ExitReason, Position};

/// Per-bar inputs a template may need beyond the bar itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitContext {
    /// True when this is the last bar of the position's trading day.
    pub is_last_bar_of_session: bool,
    /// Session ATR supplied externally per bar (None until it forms).
    pub atr: Option<f64>,
}

/// Verdict of one bar's evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitDecision {
    Hold,
    Exit {
        price: f64,
        reason: ExitReason,
        /// The configured level lay outside the bar's range (gap-through).
        gap_through: bool,
    },
}

/// Bar-by-bar exit evaluation for one OPEN position.
pub trait ExitStrategy {
    fn name(&self) -> &'static str;

    fn evaluate(&mut self, position: &Position, bar: &Bar, ctx: &ExitContext) -> ExitDecision;
}

/// Exit-at-level verdict with the gap-through flag derived from the bar.
pub(crate) fn exit_at_level(level: f64, bar: &Bar, reason: ExitReason) -> ExitDecision {
    ExitDecision::Exit {
        price: level,
        reason,
        gap_through: !bar.contains_price(level),
    }
}

/// Build the template selected by `config`.
///
/// Unrecognized templates and missing required parameters fall back to the
/// `fixed` template with conservative defaults; the returned issue string is
/// logged by the caller as an `ExitConfigInvalid` anomaly. Never fails.
pub fn build_exit_strategy(
    config: &ExitStrategyConfig,
) -> (Box<dyn ExitStrategy>, Option<String>) {
    let fallback = |issue: String| -> (Box<dyn ExitStrategy>, Option<String>) {
        (
            Box::new(FixedExit::new(
                FALLBACK_STOP_LOSS_PERCENT,
                FALLBACK_TAKE_PROFIT_PERCENT,
            )),
            Some(issue),
        )
    };

    match config.template.as_str() {
        TEMPLATE_FIXED => {
            let stop = config
                .stop_loss_percent
                .unwrap_or(FALLBACK_STOP_LOSS_PERCENT);
            let target = config
                .take_profit_percent
                .unwrap_or(FALLBACK_TAKE_PROFIT_PERCENT);
            (Box::new(FixedExit::new(stop, target)), None)
        }
        TEMPLATE_INTRADAY_TIME => match config.parsed_exit_time() {
            Some(t) => (Box::new(IntradayTimeExit::new(t)), None),
            None => fallback(format!(
                "intraday_time template requires a valid exitTime, got {:?}",
                config.exit_time
            )),
        },
        TEMPLATE_PRICE_ACTION => match config.trailing_stop_percent {
            Some(pct) if pct > 0.0 => (Box::new(PriceActionTrailing::new(pct)), None),
            other => fallback(format!(
                "price_action template requires a positive trailingStopPercent, got {other:?}"
            )),
        },
        TEMPLATE_ATR_ADAPTIVE => match config.atr_multiplier {
            Some(mult) if mult > 0.0 => (Box::new(AtrAdaptive::new(mult)), None),
            other => fallback(format!(
                "atr_adaptive template requires a positive atrMultiplier, got {other:?}"
            )),
        },
        unknown => fallback(format!("unrecognized exit template '{unknown}'")),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{bar, position};
    use super::*;
    use crate::domain::Direction;

    #[test]
    fn unrecognized_template_falls_back_to_fixed() {
        let config = ExitStrategyConfig {
            template: "galaxy_brain".into(),
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_stop_percent: None,
            exit_time: None,
            atr_multiplier: None,
        };
        let (strategy, issue) = build_exit_strategy(&config);
        assert_eq!(strategy.name(), "fixed");
        assert!(issue.unwrap().contains("galaxy_brain"));
    }

    #[test]
    fn missing_trailing_percent_falls_back() {
        let config = ExitStrategyConfig {
            template: TEMPLATE_PRICE_ACTION.into(),
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_stop_percent: None,
            exit_time: None,
            atr_multiplier: None,
        };
        let (strategy, issue) = build_exit_strategy(&config);
        assert_eq!(strategy.name(), "fixed");
        assert!(issue.is_some());
    }

    #[test]
    fn recognized_templates_build_clean() {
        for config in [
            ExitStrategyConfig::fixed(1.0, 2.0),
            ExitStrategyConfig::intraday_time("15:55:00"),
            ExitStrategyConfig::price_action(0.5),
            ExitStrategyConfig::atr_adaptive(2.0),
        ] {
            let (_, issue) = build_exit_strategy(&config);
            assert!(issue.is_none(), "template {} raised {issue:?}", config.template);
        }
    }

    #[test]
    fn fallback_still_exits_on_adverse_move() {
        // Misconfiguration must never block a forced exit.
        let config = ExitStrategyConfig {
            template: "???".into(),
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_stop_percent: None,
            exit_time: None,
            atr_multiplier: None,
        };
        let (mut strategy, _) = build_exit_strategy(&config);
        let pos = position(Direction::Long, 100.0);
        // 2% fallback stop at 98; bar trades through it.
        let decision = strategy.evaluate(&pos, &bar(1, 99.0, 99.5, 97.5, 97.8), &ExitContext::default());
        match decision {
            ExitDecision::Exit { price, reason, .. } => {
                assert!((price - 98.0).abs() < 1e-9);
                assert_eq!(reason, crate::domain::ExitReason::StopLoss);
            }
            ExitDecision::Hold => panic!("fallback stop should have fired"),
        }
    }
}
