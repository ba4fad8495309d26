//! Performance metrics — pure functions over the ledger.
//!
//! Every metric is a pure function: trade list and/or equity curve in,
//! scalar out. No dependencies on the scheduler or the worker pool.

use scanlab_core::domain::{EquityPoint, Trade};
use scanlab_core::ledger::TradeLedger;
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub final_equity: f64,
}

impl PerformanceMetrics {
    pub fn compute(ledger: &TradeLedger) -> Self {
        let trades = ledger.trades();
        Self {
            trade_count: trades.len(),
            wins: ledger.wins(),
            losses: ledger.losses(),
            win_rate: win_rate(trades),
            total_pnl: ledger.total_pnl(),
            avg_pnl: avg_pnl(trades),
            profit_factor: profit_factor(trades),
            max_drawdown: max_drawdown(ledger.equity_curve()),
            final_equity: ledger.equity(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive PnL. 0.0 when there are no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

pub fn avg_pnl(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64
}

/// Gross profit over gross loss. Infinity when there are wins but no losses,
/// 0.0 when there are no trades.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| -t.pnl)
        .sum();
    if gross_loss == 0.0 {
        if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        gross_profit / gross_loss
    }
}

/// Maximum peak-to-trough drawdown as a fraction of the peak.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for point in equity_curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.max((peak - point.equity) / peak);
        }
    }
    worst
}
