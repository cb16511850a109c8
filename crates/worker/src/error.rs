//! Structured errors for the lifecycle boundaries.
//!
//! The router has no error type: every request ends in a response.

use offcache_client::UrlError;
use offcache_core::Error;

/// Errors reported by the install and activate phases.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The manifest could not be cached; the version must not go live.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(#[source] Error),

    /// Old stores could not be listed; stale stores may remain.
    #[error("ACTIVATION_FAILED: {0}")]
    ActivationFailed(#[source] Error),

    /// Scope, manifest or fallback cannot be resolved.
    #[error("INVALID_CONFIG: {0}")]
    InvalidConfig(String),
}

impl From<UrlError> for WorkerError {
    fn from(err: UrlError) -> Self {
        WorkerError::InvalidConfig(err.to_string())
    }
}
