use std::time::Duration;

use thiserror::Error;

/// Failures talking to the shared cache store.
///
/// Both variants are non-fatal to a request: the caller serves the
/// document it resolved from disk.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache store '{backend}' unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("cache store '{backend}' did not answer within {after:?}")]
    Timeout { backend: String, after: Duration },
}

impl StoreError {
    pub(crate) fn unavailable(backend: &str, reason: impl ToString) -> Self {
        StoreError::Unavailable {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }
}
