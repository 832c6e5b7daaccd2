//! Context implementation for cancellation and deadlines
//!
//! This module provides the Context type which carries a cancellation signal
//! and an optional deadline across the wait and retry loops. A wait that is
//! cancelled mid-sleep or between polls returns promptly instead of running
//! out its full timeout.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Context carries a cancellation signal and an optional deadline.
/// Pass this to `StateChangeConf::wait` and `retry_when`; a caller aborting
/// the surrounding operation calls `cancel()` to unblock them.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Returns a context that cancels itself once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;

        let (done_tx, done_rx) = watch::channel(false);

        let done_tx_clone = done_tx.clone();
        tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let _ = done_tx_clone.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Resolves when the context is cancelled. Never resolves for a context
    /// that is neither cancelled nor carrying a deadline.
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        loop {
            if *done.borrow() {
                return;
            }
            if done.changed().await.is_err() {
                // Sender gone without ever signalling; cancellation can no
                // longer happen.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration`, waking early on cancellation. Returns false if
    /// the sleep was interrupted by `cancel()`.
    pub(crate) async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn context_timeout_cancels() {
        let ctx = Context::with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());

        let ctx_with_timeout = Context::with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_interrupted_by_cancel() {
        let ctx = Context::new();
        let ctx_clone = ctx.clone();

        let handle = tokio::spawn(async move {
            ctx_clone.sleep(Duration::from_secs(3600)).await
        });

        sleep(Duration::from_millis(10)).await;
        ctx.cancel();

        let completed = handle.await.unwrap();
        assert!(!completed);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_runs_to_completion() {
        let ctx = Context::new();
        assert!(ctx.sleep(Duration::from_millis(50)).await);
    }
}
