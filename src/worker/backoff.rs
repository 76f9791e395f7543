// src/worker/backoff.rs
use std::time::Duration;

const FIRST_RETRY: Duration = Duration::from_secs(2);

/// Delay before the next cycle: the poll interval after a success, a doubling
/// retry delay (capped) after consecutive failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    max: Duration,
    failure_delay: Option<Duration>,
}

impl Backoff {
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            interval,
            max,
            failure_delay: None,
        }
    }

    pub fn next_delay(&mut self, cycle_ok: bool) -> Duration {
        if cycle_ok {
            self.failure_delay = None;
            return self.interval;
        }
        let d = match self.failure_delay {
            None => FIRST_RETRY,
            Some(prev) => prev.saturating_mul(2),
        }
        .min(self.max);
        self.failure_delay = Some(d);
        d
    }

    pub fn is_backing_off(&self) -> bool {
        self.failure_delay.is_some()
    }
}
