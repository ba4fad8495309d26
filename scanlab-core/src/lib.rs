//! ScanLab Core — point-in-time replay and scanner-sandbox simulation.
//!
//! This crate contains the heart of the simulation:
//! - Domain types (bars, signals, positions, trades)
//! - Bar store interface with a point-in-time view enforcing no lookahead
//! - Scanner worker protocol, process pool, and legacy single-shot mode
//! - Day-by-day, bar-by-bar replay scheduler with signal validation
//! - Exit strategy state machine (fixed, time, trailing, ATR templates)
//! - Append-only trade ledger with a deterministic digest

pub mod domain;
pub mod exits;
pub mod indicators;
pub mod ledger;
pub mod replay;
pub mod scanner;
pub mod store;
