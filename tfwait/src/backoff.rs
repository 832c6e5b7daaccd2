//! Capped exponential backoff shared by the wait and retry loops
//!
//! Both `StateChangeConf::wait` and `retry_when` draw their inter-attempt
//! delays from this one schedule so the two loops stay testable against the
//! same timing model.

use std::time::Duration;

/// Delay schedule: starts at `initial`, doubles per step, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Returns the delay to sleep now and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}
