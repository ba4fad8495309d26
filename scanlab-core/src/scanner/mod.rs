//! Scanning-module execution: wire protocol, process pool, legacy one-shot.
//!
//! The core never depends on how a module's source text was produced — only
//! on the module satisfying the two protocol modes. The `Scanner` trait is
//! the seam between the replay scheduler and the pool, so tests can drive
//! the scheduler with in-process fakes.

pub mod legacy;
pub mod pool;
pub mod protocol;

pub use pool::{PoolConfig, ScannerPool};
pub use protocol::{
    ProtocolError, ScanRequest, ScanResponse, ENV_DATA_SOURCE_HANDLE, ENV_TICKERS,
    PERSISTENT_FLAG, READY_LINE,
};

use thiserror::Error;

/// Scan failure taxonomy.
///
/// Fatal variants threaten the liveness of the whole run; everything else is
/// recovered per request and logged by the caller.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("worker startup failed for module '{module}': {reason}")]
    WorkerStartupFailed { module: String, reason: String },

    #[error("worker crashed mid-request (request {request_id})")]
    WorkerCrashed { request_id: u64 },

    #[error("scan request {request_id} timed out after {timeout_ms}ms")]
    ScanTimeout { request_id: u64, timeout_ms: u64 },

    #[error("malformed worker response: {0}")]
    MalformedResponse(#[from] ProtocolError),

    #[error("worker respawn budget exhausted after {respawns} respawn(s)")]
    RespawnExhausted { respawns: usize },
}

impl ScanError {
    /// True when the error must abort the run rather than drop one request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::WorkerStartupFailed { .. } | ScanError::RespawnExhausted { .. }
        )
    }
}

/// Anything the replay scheduler can ask for signals.
///
/// `&mut self` because the underlying protocol serializes requests: the 1:1
/// request/response pairing holds only in arrival order.
pub trait Scanner {
    fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError>;
}
