//! tfwait - State-transition waiter for Terraform providers in Rust
//!
//! Resource lifecycle code issues a mutating API call, then has to wait for
//! the remote object to settle into a usable state. This crate provides the
//! generic pieces every such waiter is built from: a poll-until-state engine
//! (`StateChangeConf`), a transient-error retry wrapper for the mutating call
//! itself (`retry_when`), and helpers for mapping describe-call results into
//! the engine's vocabulary.

// Core modules
pub mod backoff;
pub mod context;
pub mod error;
pub mod refresh;

// Engine modules
pub mod retry;
pub mod state;

// Helper modules
pub mod result;

// Re-exports for convenience
pub use backoff::Backoff;
pub use context::Context;
pub use error::{BoxError, RetryError, WaitError};
pub use refresh::{Refresh, RefreshError, RefreshResult};
pub use result::{at_most_one, exactly_one, FindError};
pub use retry::retry_when;
pub use state::{StateChangeConf, Target};
