//! Pipeline-level error type (§7), wrapping the lower layers' errors.

use thiserror::Error;

use copier_config::ConfigError;
use copier_github::HostError;

/// A failure that aborts the whole webhook's processing.
///
/// Per-file and per-batch failures (`MatchError`, `TransformError`,
/// `HostError` from a single batch flush) are recovered locally and recorded
/// in a [`crate::metrics::RunMetrics`] instead of reaching here (§7
/// "Propagation"). A `HostError` reaches here only from the changed-files
/// fetch, which the whole webhook depends on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration failed to load: {0}")]
    Config(#[from] ConfigError),

    #[error("fetching changed files failed: {0}")]
    Host(#[from] HostError),

    #[error("webhook processing was cancelled before completion")]
    Cancelled,
}
