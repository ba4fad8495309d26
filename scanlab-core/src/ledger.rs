//! Trade ledger: append-only record of closed trades and the equity curve.

use crate::domain::{EquityPoint, Trade};
use serde::Serialize;

/// Closed trades plus the running-equity curve of one replay run.
///
/// Append-only: trades are never mutated or reordered after recording, so the
/// digest of two runs over identical inputs is identical.
#[derive(Debug, Clone, Serialize)]
pub struct TradeLedger {
    initial_equity: f64,
    equity: f64,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl TradeLedger {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            equity: initial_equity,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Append one closed trade and mark the equity curve at its exit.
    pub fn record_trade(&mut self, trade: Trade) {
        self.equity += trade.pnl;
        self.equity_curve.push(EquityPoint {
            timestamp: trade.exit_timestamp,
            equity: self.equity,
        });
        self.trades.push(trade);
    }

    /// Mark the current equity at `timestamp` without a trade (run start,
    /// day boundaries).
    pub fn mark_equity(&mut self, timestamp: i64) {
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.equity,
        });
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn initial_equity(&self) -> f64 {
        self.initial_equity
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn wins(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }

    pub fn losses(&self) -> usize {
        self.trades.iter().filter(|t| !t.is_winner()).count()
    }

    pub fn total_pnl(&self) -> f64 {
        self.equity - self.initial_equity
    }

    /// Blake3 digest over the serialized trades and equity curve. Two runs
    /// over identical inputs must produce identical digests.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        // Serialization of the ledger is deterministic: Vec order is append
        // order and Trade has no map fields.
        if let Ok(bytes) = serde_json::to_vec(&self.trades) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = serde_json::to_vec(&self.equity_curve) {
            hasher.update(&bytes);
        }
        hasher.finalize().to_hex().to_string()
    }
}
