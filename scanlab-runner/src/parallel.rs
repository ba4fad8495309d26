//! Batch execution of independent run configurations.
//!
//! Each config gets its own worker process and its own ledger, so runs are
//! embarrassingly parallel. One shared cancel token stops the whole batch.

use rayon::prelude::*;
use scanlab_core::replay::CancelToken;
use tracing::warn;

use crate::config::RunConfig;
use crate::runner::{execute_run, RunError, RunOutcome};

/// Run every config in parallel, one worker process per config.
///
/// Failures do not abort siblings: each slot carries its own result.
pub fn run_many(
    configs: &[RunConfig],
    cancel: &CancelToken,
) -> Vec<Result<RunOutcome, RunError>> {
    configs
        .par_iter()
        .map(|config| {
            let outcome = execute_run(config, cancel);
            if let Err(e) = &outcome {
                warn!(run_id = %config.run_id(), error = %e, "batch run failed");
            }
            outcome
        })
        .collect()
}
