//! ScanLab Runner — run orchestration, bar loading, metrics, and exports.
//!
//! This crate turns a TOML config into a finished run: it loads bars from
//! CSV, spawns the configured scanner worker, drives the core's replay
//! scheduler, computes performance metrics, and writes the artifact set.

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod parallel;
pub mod runner;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_bars, LoadError, LoadedBars};
pub use export::save_artifacts;
pub use metrics::PerformanceMetrics;
pub use runner::{execute_run, run_with_scanner, RunError, RunOutcome};
