//! Poll-until-state engine
//!
//! `StateChangeConf` polls a caller-supplied refresh function until the
//! remote object reaches a target state, following the same shape as the
//! per-resource waiters it replaces: a pending set, a target set, a refresh
//! closure bound to one describe call, and a timeout.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::context::Context;
use crate::error::{BoxError, WaitError};
use crate::refresh::{Refresh, RefreshError, RefreshResult};

/// A single target condition: a state label, or the object no longer
/// existing at all (delete-and-wait).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    State(String),
    Removed,
}

/// Configuration for one wait: which states mean "keep polling", which mean
/// "done", which mean "failed", and how long to keep trying.
///
/// Built fresh per invocation and consumed by [`StateChangeConf::wait`].
/// States the caller listed in neither set are treated as still pending; a
/// state only terminates the wait early if it is listed in `fatal`.
pub struct StateChangeConf<T, F> {
    pending: Vec<String>,
    target: Vec<Target>,
    fatal: Vec<String>,
    refresh: F,
    timeout: Duration,
    initial_delay: Duration,
    max_delay: Duration,
    not_found_checks: u32,
    continuous_target: u32,
    _object: std::marker::PhantomData<T>,
}

/// Default inter-poll schedule, sized for slow-moving infrastructure state.
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Consecutive not-found observations tolerated by default.
const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

impl<T, F> StateChangeConf<T, F> {
    pub fn new(refresh: F) -> Self {
        Self {
            pending: Vec::new(),
            target: Vec::new(),
            fatal: Vec::new(),
            refresh,
            timeout: Duration::ZERO,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target: 1,
            _object: std::marker::PhantomData,
        }
    }

    /// States that mean the operation is still in flight.
    pub fn pending<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = labels.into_iter().map(Into::into).collect();
        self
    }

    /// States that mean the operation succeeded.
    pub fn target<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target
            .extend(labels.into_iter().map(|s| Target::State(s.into())));
        self
    }

    /// Treat the object no longer existing as success. Used when waiting out
    /// a deletion.
    pub fn target_removed(mut self) -> Self {
        self.target.push(Target::Removed);
        self
    }

    /// States that mean the operation failed and polling should stop.
    pub fn fatal<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fatal = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Total time budget for the wait. Required; must be greater than zero.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay before the second poll; later polls back off exponentially from
    /// here. The first poll is issued immediately.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Upper bound on the inter-poll delay.
    pub fn max_delay(mut self, max: Duration) -> Self {
        self.max_delay = max;
        self
    }

    /// How many consecutive not-found observations to tolerate before giving
    /// up, when the target is not [`Target::Removed`]. Absorbs read-after-write
    /// lag immediately after a create.
    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// How many consecutive polls must observe a target state before the wait
    /// counts as done. Some APIs briefly report a state they later leave.
    pub fn continuous_target(mut self, occurrences: u32) -> Self {
        self.continuous_target = occurrences.max(1);
        self
    }

    /// Target set as labels for diagnostics; `Target::Removed` shows up as
    /// "removed" so a delete-wait timeout names what it was waiting for.
    fn target_labels(&self) -> Vec<String> {
        self.target
            .iter()
            .map(|t| match t {
                Target::State(s) => s.clone(),
                Target::Removed => "removed".to_string(),
            })
            .collect()
    }

    fn target_includes_removed(&self) -> bool {
        self.target.iter().any(|t| matches!(t, Target::Removed))
    }

    fn target_includes(&self, state: &str) -> bool {
        self.target
            .iter()
            .any(|t| matches!(t, Target::State(s) if s == state))
    }

    fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }
        // An empty target set is legal: a delete waiter that only ends via
        // Removed, a fatal state, or the timeout.
        for label in &self.pending {
            if self.target_includes(label) {
                return Err(format!("state {:?} is both pending and target", label));
            }
            if self.fatal.contains(label) {
                return Err(format!("state {:?} is both pending and fatal", label));
            }
        }
        for label in &self.fatal {
            if self.target_includes(label) {
                return Err(format!("state {:?} is both target and fatal", label));
            }
        }
        Ok(())
    }
}

impl<T, F, Fut> StateChangeConf<T, F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RefreshResult<T>>,
{
    /// Polls until a target state is reached or the wait terminates.
    ///
    /// Returns `Ok(Some(object))` when a target state was observed,
    /// `Ok(None)` when the target was [`Target::Removed`] and the object is
    /// gone. Every other outcome is a distinct [`WaitError`] variant.
    pub async fn wait(mut self, ctx: &Context) -> Result<Option<T>, WaitError<T>> {
        self.validate().map_err(WaitError::Configuration)?;

        let deadline = Instant::now() + self.timeout;
        let mut backoff = Backoff::new(self.initial_delay, self.max_delay);
        let mut last: Option<(T, String)> = None;
        let mut last_error: Option<BoxError> = None;
        let mut not_found_streak: u32 = 0;
        let mut target_streak: u32 = 0;

        tracing::debug!(
            target_states = ?self.target,
            pending_states = ?self.pending,
            timeout = ?self.timeout,
            "waiting for state change"
        );

        loop {
            if ctx.is_cancelled() {
                return Err(WaitError::Cancelled);
            }

            let observed = tokio::select! {
                result = (self.refresh)() => result,
                _ = ctx.cancelled() => return Err(WaitError::Cancelled),
            };

            match observed {
                Err(RefreshError::Fatal(source)) => {
                    tracing::debug!(error = %source, "refresh failed, giving up");
                    return Err(WaitError::Refresh(source));
                }
                Err(RefreshError::Transient(source)) => {
                    tracing::trace!(error = %source, "transient refresh failure, will poll again");
                    last_error = Some(source);
                    target_streak = 0;
                    // A failed observation is not a not-found observation;
                    // the grace count only tracks consecutive absences.
                    not_found_streak = 0;
                }
                Ok(Refresh::Absent) => {
                    if self.target_includes_removed() {
                        tracing::debug!("object gone, target state reached");
                        return Ok(None);
                    }
                    target_streak = 0;
                    not_found_streak += 1;
                    if not_found_streak >= self.not_found_checks {
                        return Err(WaitError::NotFound {
                            checks: not_found_streak,
                        });
                    }
                    tracing::trace!(
                        streak = not_found_streak,
                        "object not found, within grace period"
                    );
                }
                Ok(Refresh::Found { object, state }) => {
                    not_found_streak = 0;
                    if self.target_includes(&state) {
                        target_streak += 1;
                        if target_streak >= self.continuous_target {
                            tracing::debug!(state = %state, "target state reached");
                            return Ok(Some(object));
                        }
                        tracing::trace!(
                            state = %state,
                            streak = target_streak,
                            needed = self.continuous_target,
                            "target state seen, waiting for it to hold"
                        );
                        last = Some((object, state));
                    } else if self.fatal.contains(&state) {
                        tracing::debug!(state = %state, "unexpected terminal state");
                        return Err(WaitError::UnexpectedState {
                            state,
                            expected: self.target_labels(),
                            last: object,
                        });
                    } else {
                        // In the pending set or unknown; both keep polling.
                        target_streak = 0;
                        tracing::trace!(state = %state, "still pending");
                        last = Some((object, state));
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                let (last, last_state) = match last {
                    Some((object, state)) => (Some(object), Some(state)),
                    None => (None, None),
                };
                return Err(WaitError::Timeout {
                    timeout: self.timeout,
                    expected: self.target_labels(),
                    last_state,
                    last,
                    last_error,
                });
            }

            let delay = backoff.next_delay().min(deadline - now);
            if !ctx.sleep(delay).await {
                return Err(WaitError::Cancelled);
            }
        }
    }
}
