//! Probe vocabulary: what a refresh function reports back to the engine
//!
//! A refresh function wraps one read-only describe/get-style call against the
//! remote API and maps the response into `RefreshResult`. It must not retry
//! internally; backoff and retries belong to the engine.

use crate::error::BoxError;

/// One observation of the remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh<T> {
    /// The object exists and reports the given state label.
    Found { object: T, state: String },
    /// The object does not exist (e.g., a 404 or an empty describe result
    /// during delete-and-wait).
    Absent,
}

impl<T> Refresh<T> {
    pub fn found(object: T, state: impl Into<String>) -> Self {
        Refresh::Found {
            object,
            state: state.into(),
        }
    }
}

/// A failed observation, classified by the caller.
///
/// The engine never inspects error text; whether an error is worth another
/// poll is decided here, by whoever built the refresh function.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Worth polling again (e.g., throttling, a not-yet-propagated read).
    #[error("transient refresh failure: {0}")]
    Transient(#[source] BoxError),

    /// Stop immediately (e.g., permission denied, malformed request).
    #[error("refresh failed: {0}")]
    Fatal(#[source] BoxError),
}

impl RefreshError {
    pub fn transient(err: impl Into<BoxError>) -> Self {
        RefreshError::Transient(err.into())
    }

    pub fn fatal(err: impl Into<BoxError>) -> Self {
        RefreshError::Fatal(err.into())
    }
}

/// What a refresh function returns.
pub type RefreshResult<T> = Result<Refresh<T>, RefreshError>;
