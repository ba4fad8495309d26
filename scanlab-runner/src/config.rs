//! Serializable run configuration.
//!
//! One TOML file describes everything needed to reproduce a run: the bar
//! data source, the worker command line, replay parameters, and the exit
//! template. Identical configs hash to identical run ids.

use chrono::NaiveDate;
use scanlab_core::exits::ExitStrategyConfig;
use scanlab_core::replay::ReplayConfig;
use scanlab_core::scanner::PoolConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for a single replay run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub data: DataConfig,
    pub worker: WorkerConfig,
    pub replay: ReplaySettings,
    pub exit: ExitStrategyConfig,
}

/// Where the bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// CSV file of intraday bars.
    pub bars_csv: PathBuf,
    /// Handle passed to workers as the data-source identifier. Defaults to
    /// the CSV path.
    #[serde(default)]
    pub handle: Option<String>,
}

/// Worker process command line and lifecycle limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    /// Program hosting the scanning module (a script runtime).
    pub program: String,
    /// Arguments placed before the module path.
    #[serde(default)]
    pub args: Vec<String>,
    /// Path of the scanning module.
    pub module: PathBuf,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    #[serde(default = "default_max_respawns")]
    pub max_respawns: usize,
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
}

/// Replay scheduling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplaySettings {
    pub universe: Vec<String>,
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
    #[serde(default = "default_warmup_bars")]
    pub warmup_bars: usize,
    #[serde(default)]
    pub max_signals_per_step: Option<usize>,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default = "default_initial_equity")]
    pub initial_equity: f64,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
}

fn default_startup_timeout_ms() -> u64 {
    10_000
}

fn default_scan_timeout_ms() -> u64 {
    30_000
}

fn default_max_respawns() -> usize {
    1
}

fn default_kill_grace_ms() -> u64 {
    2_000
}

fn default_warmup_bars() -> usize {
    30
}

fn default_quantity() -> f64 {
    100.0
}

fn default_initial_equity() -> f64 {
    10_000.0
}

fn default_atr_period() -> usize {
    14
}

impl RunConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replay.universe.is_empty() {
            return Err(ConfigError::Invalid("replay.universe is empty".into()));
        }
        if self.replay.start > self.replay.end {
            return Err(ConfigError::Invalid(format!(
                "replay.start {} is after replay.end {}",
                self.replay.start, self.replay.end
            )));
        }
        if self.replay.quantity <= 0.0 {
            return Err(ConfigError::Invalid("replay.quantity must be positive".into()));
        }
        if self.replay.initial_equity <= 0.0 {
            return Err(ConfigError::Invalid(
                "replay.initial_equity must be positive".into(),
            ));
        }
        if self.worker.program.is_empty() {
            return Err(ConfigError::Invalid("worker.program is empty".into()));
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId, so their artifacts can
    /// be deduplicated.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Data-source handle workers receive (before the as-of suffix).
    pub fn data_handle(&self) -> String {
        self.data
            .handle
            .clone()
            .unwrap_or_else(|| self.data.bars_csv.display().to_string())
    }

    pub fn pool_config(&self) -> PoolConfig {
        let mut pool = PoolConfig::new(self.worker.program.clone(), self.worker.module.clone());
        pool.args = self.worker.args.clone();
        pool.startup_timeout = Duration::from_millis(self.worker.startup_timeout_ms);
        pool.scan_timeout = Duration::from_millis(self.worker.scan_timeout_ms);
        pool.max_respawns = self.worker.max_respawns;
        pool.kill_grace = Duration::from_millis(self.worker.kill_grace_ms);
        pool
    }

    pub fn replay_config(&self) -> ReplayConfig {
        let mut replay = ReplayConfig::new(
            self.replay.universe.clone(),
            self.replay.start,
            self.replay.end,
            self.exit.clone(),
        );
        replay.warmup_bars = self.replay.warmup_bars;
        replay.max_signals_per_step = self.replay.max_signals_per_step;
        replay.quantity = self.replay.quantity;
        replay.initial_equity = self.replay.initial_equity;
        replay.atr_period = self.replay.atr_period;
        replay
    }
}
