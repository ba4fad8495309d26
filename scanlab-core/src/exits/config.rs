//! Exit strategy configuration, supplied per agent/run by an external
//! collaborator. Read-only during a run; field names are camelCase because
//! the record arrives from the same side as the worker wire protocol.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Template names this core recognizes.
pub const TEMPLATE_FIXED: &str = "fixed";
pub const TEMPLATE_INTRADAY_TIME: &str = "intraday_time";
pub const TEMPLATE_PRICE_ACTION: &str = "price_action";
pub const TEMPLATE_ATR_ADAPTIVE: &str = "atr_adaptive";

/// Conservative fallback applied when a template is unrecognized or its
/// required parameters are missing. Misconfiguration must never block a
/// forced exit, so the fallback is a tight fixed stop, not an error.
pub const FALLBACK_STOP_LOSS_PERCENT: f64 = 2.0;
pub const FALLBACK_TAKE_PROFIT_PERCENT: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitStrategyConfig {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_stop_percent: Option<f64>,
    /// "HH:MM:SS"; parsed when the template is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atr_multiplier: Option<f64>,
}

impl ExitStrategyConfig {
    pub fn fixed(stop_loss_percent: f64, take_profit_percent: f64) -> Self {
        Self {
            template: TEMPLATE_FIXED.to_string(),
            stop_loss_percent: Some(stop_loss_percent),
            take_profit_percent: Some(take_profit_percent),
            trailing_stop_percent: None,
            exit_time: None,
            atr_multiplier: None,
        }
    }

    pub fn intraday_time(exit_time: &str) -> Self {
        Self {
            template: TEMPLATE_INTRADAY_TIME.to_string(),
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_stop_percent: None,
            exit_time: Some(exit_time.to_string()),
            atr_multiplier: None,
        }
    }

    pub fn price_action(trailing_stop_percent: f64) -> Self {
        Self {
            template: TEMPLATE_PRICE_ACTION.to_string(),
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_stop_percent: Some(trailing_stop_percent),
            exit_time: None,
            atr_multiplier: None,
        }
    }

    pub fn atr_adaptive(atr_multiplier: f64) -> Self {
        Self {
            template: TEMPLATE_ATR_ADAPTIVE.to_string(),
            stop_loss_percent: None,
            take_profit_percent: None,
            trailing_stop_percent: None,
            exit_time: None,
            atr_multiplier: Some(atr_multiplier),
        }
    }

    /// Parsed exit time, if present and well-formed.
    pub fn parsed_exit_time(&self) -> Option<NaiveTime> {
        self.exit_time
            .as_deref()
            .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
    }
}
