//! Helpers for list-style describe results
//!
//! Finder functions frequently issue a filtered list call that should match
//! exactly one remote object. Zero or multiple matches means the caller's
//! identifier or filter is wrong, not that the API is lagging, so both map to
//! non-retryable errors.

use crate::refresh::RefreshError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FindError {
    #[error("empty result: no matching resource found")]
    EmptyResult,

    #[error("too many results: wanted 1, got {count}")]
    TooManyResults { count: usize },
}

/// Never worth another poll; a wrong ID does not fix itself.
impl From<FindError> for RefreshError {
    fn from(err: FindError) -> Self {
        RefreshError::Fatal(Box::new(err))
    }
}

/// Asserts that a list call matched exactly one object.
pub fn exactly_one<T>(mut items: Vec<T>) -> Result<T, FindError> {
    match items.len() {
        0 => Err(FindError::EmptyResult),
        1 => Ok(items.remove(0)),
        count => Err(FindError::TooManyResults { count }),
    }
}

/// Asserts that a list call matched at most one object. Absence is legitimate
/// here (the caller maps `None` to `Refresh::Absent`).
pub fn at_most_one<T>(mut items: Vec<T>) -> Result<Option<T>, FindError> {
    match items.len() {
        0 => Ok(None),
        1 => Ok(Some(items.remove(0))),
        count => Err(FindError::TooManyResults { count }),
    }
}
