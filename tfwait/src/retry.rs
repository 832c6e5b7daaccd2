//! Transient-error retry around a mutating call
//!
//! `retry_when` wraps the mutating API call itself, not the poll that
//! follows it. The classic case is eventual consistency between services: a
//! freshly created principal is not yet visible to the service the next call
//! talks to, so the call fails with an error the caller knows is transient.
//! Classification is entirely the caller's; this function never inspects
//! error text.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::context::Context;
use crate::error::RetryError;

/// Delay schedule for mutation retries; consistency lag clears much faster
/// than a resource state transition, so this is tighter than the poll
/// schedule.
const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Invokes `operation` until it succeeds, the classifier declares an error
/// permanent, the deadline elapses, or the context is cancelled.
///
/// `classifier` returns true when the error is transient and the call should
/// be retried. The deadline is checked after each failed attempt, so the
/// operation always runs at least once.
pub async fn retry_when<T, E, F, Fut, C>(
    ctx: &Context,
    timeout: Duration,
    mut operation: F,
    classifier: C,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut backoff = Backoff::new(RETRY_INITIAL_DELAY, RETRY_MAX_DELAY);

    loop {
        if ctx.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let error = tokio::select! {
            result = operation() => match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            },
            _ = ctx.cancelled() => return Err(RetryError::Cancelled),
        };

        if !classifier(&error) {
            return Err(RetryError::Operation(error));
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(RetryError::Timeout {
                timeout,
                last: error,
            });
        }

        let delay = backoff.next_delay().min(deadline - now);
        tracing::debug!(delay = ?delay, "transient error, retrying operation");
        if !ctx.sleep(delay).await {
            return Err(RetryError::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::ready;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum FakeError {
        #[error("not yet visible")]
        NotYetVisible,
        #[error("access denied")]
        AccessDenied,
    }

    fn is_transient(err: &FakeError) -> bool {
        matches!(err, FakeError::NotYetVisible)
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = retry_when(
            &Context::new(),
            Duration::from_secs(10),
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                ready(Ok::<_, FakeError>("created"))
            },
            is_transient,
        )
        .await;

        assert_eq!(assert_ok!(result), "created");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = retry_when(
            &Context::new(),
            Duration::from_secs(60),
            move || {
                let attempt = calls_clone.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    ready(Err(FakeError::NotYetVisible))
                } else {
                    ready(Ok("created"))
                }
            },
            is_transient,
        )
        .await;

        assert_eq!(assert_ok!(result), "created");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_fails_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result: Result<&str, _> = retry_when(
            &Context::new(),
            Duration::from_secs(60),
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                ready(Err(FakeError::AccessDenied))
            },
            is_transient,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Operation(FakeError::AccessDenied)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_surfaces_last_transient_error() {
        let result: Result<&str, _> = retry_when(
            &Context::new(),
            Duration::from_secs(5),
            || ready(Err(FakeError::NotYetVisible)),
            is_transient,
        )
        .await;

        let err = result.unwrap_err();
        match err {
            RetryError::Timeout { last, .. } => assert_eq!(last, FakeError::NotYetVisible),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_retrying() {
        let ctx = Context::new();
        let cancel_ctx = ctx.clone();

        let handle = tokio::spawn(async move {
            retry_when(
                &ctx,
                Duration::from_secs(3600),
                || ready(Err::<&str, _>(FakeError::NotYetVisible)),
                is_transient,
            )
            .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel_ctx.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, RetryError::Cancelled));
    }
}
