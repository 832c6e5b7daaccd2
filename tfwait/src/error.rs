//! Error types for tfwait

use std::time::Duration;

/// Boxed source error used where callers supply their own error values.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal outcomes of `StateChangeConf::wait` other than success.
///
/// `T` is the caller's object type; variants carry the last observed object
/// where one exists so callers can build diagnostics from it.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<T> {
    #[error("invalid wait configuration: {0}")]
    Configuration(String),

    #[error("timeout after {timeout:?} waiting for state to become {expected:?} (last state: {last_state:?})")]
    Timeout {
        timeout: Duration,
        expected: Vec<String>,
        last_state: Option<String>,
        last: Option<T>,
        #[source]
        last_error: Option<BoxError>,
    },

    #[error("unexpected state {state:?}, wanted target {expected:?}")]
    UnexpectedState {
        state: String,
        expected: Vec<String>,
        last: T,
    },

    #[error("couldn't find resource ({checks} consecutive not-found checks)")]
    NotFound { checks: u32 },

    #[error("refresh failed: {0}")]
    Refresh(#[source] BoxError),

    #[error("wait cancelled")]
    Cancelled,
}

impl<T> WaitError<T> {
    /// The object observed on the poll that terminated the wait, if any.
    pub fn last_object(&self) -> Option<&T> {
        match self {
            WaitError::Timeout { last, .. } => last.as_ref(),
            WaitError::UnexpectedState { last, .. } => Some(last),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WaitError::NotFound { .. })
    }
}

/// Terminal outcomes of `retry_when` other than success.
///
/// `E` is the operation's own error type.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The classifier marked the error non-retryable.
    #[error(transparent)]
    Operation(E),

    /// The deadline elapsed; carries the last transient error observed.
    #[error("timeout after {timeout:?}: {last}")]
    Timeout { timeout: Duration, last: E },

    #[error("retry cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// The underlying operation error, whether retries were exhausted or not.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Operation(e) | RetryError::Timeout { last: e, .. } => Some(e),
            RetryError::Cancelled => None,
        }
    }
}
