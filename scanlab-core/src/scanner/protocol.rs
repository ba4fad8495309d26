//! Scanner worker line protocol.
//!
//! Persistent mode, per worker lifetime:
//! - worker prints one literal `READY` line once initialization completes
//! - host writes one `ScanRequest` JSON object per line on stdin
//! - worker writes one `ScanResponse` JSON line, then another `READY` line
//! - stderr carries free-form diagnostics and is never parsed
//!
//! Legacy (single-shot) mode: parameters arrive via the `dataSourceHandle`
//! and `tickers` environment variables; the worker prints one Signal[] JSON
//! line and exits. Wire field names are camelCase; `Signal` keeps its stored
//! snake_case shape.

use crate::domain::Signal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal line a persistent worker emits when it is ready for a request.
pub const READY_LINE: &str = "READY";

/// Flag appended to the worker command line to select persistent mode.
pub const PERSISTENT_FLAG: &str = "--persistent";

/// Environment variable carrying the data-source handle in legacy mode.
pub const ENV_DATA_SOURCE_HANDLE: &str = "dataSourceHandle";

/// Environment variable carrying the comma-joined tickers in legacy mode.
pub const ENV_TICKERS: &str = "tickers";

/// Errors from encoding or decoding protocol lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode protocol line: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed protocol line {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One scan request, created per scheduler step and consumed by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub request_id: u64,
    /// As-of data-source handle; what it exposes bounds what the worker sees.
    pub data_source_handle: String,
    pub tickers: Vec<String>,
}

/// One scan response line. Never retained beyond validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub request_id: u64,
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanRequest {
    /// Encode as a single line (no trailing newline).
    pub fn encode_line(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

impl ScanResponse {
    pub fn decode_line(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line.trim()).map_err(|source| ProtocolError::Decode {
            line: truncate_for_error(line),
            source,
        })
    }

    pub fn encode_line(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Decode the single Signal[] line a legacy-mode worker prints.
pub fn decode_signals_line(line: &str) -> Result<Vec<Signal>, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(|source| ProtocolError::Decode {
        line: truncate_for_error(line),
        source,
    })
}

/// Keep error messages readable when a worker dumps a huge invalid line.
fn truncate_for_error(line: &str) -> String {
    const MAX: usize = 200;
    if line.len() <= MAX {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX).collect();
        format!("{head}…")
    }
}
