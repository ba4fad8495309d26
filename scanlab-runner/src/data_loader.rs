//! Bar loading for the runner.
//!
//! Bars arrive as one CSV per run with the columns
//! `ticker,timestamp,open,high,low,close,volume,time_of_day,trading_day`.
//! Rows failing the OHLC sanity check are dropped with a warning rather than
//! failing the whole run; a file that yields zero usable bars is an error.

use scanlab_core::domain::Bar;
use scanlab_core::store::InMemoryBarStore;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open bars file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no usable bars in '{path}'")]
    Empty { path: PathBuf },
}

/// Outcome of loading one bars file.
#[derive(Debug)]
pub struct LoadedBars {
    pub store: InMemoryBarStore,
    pub rows: usize,
    pub skipped: usize,
}

/// Load bars from a CSV file into an in-memory store.
pub fn load_bars(path: &Path, handle: impl Into<String>) -> Result<LoadedBars, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut store = InMemoryBarStore::new(handle);
    let mut rows = 0usize;
    let mut skipped = 0usize;

    for record in reader.deserialize::<Bar>() {
        let bar = record?;
        rows += 1;
        if !bar.is_sane() {
            skipped += 1;
            warn!(
                ticker = %bar.ticker,
                timestamp = bar.timestamp,
                "dropping bar that fails OHLC sanity"
            );
            continue;
        }
        store.push_bar(bar);
    }
    store.sort_sessions();

    if store.bar_count() == 0 {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    info!(
        path = %path.display(),
        bars = store.bar_count(),
        skipped,
        "bars loaded"
    );
    Ok(LoadedBars {
        store,
        rows,
        skipped,
    })
}
