//! Injectable retry pacing for the enrichment loops.

use std::time::Duration;

/// Decides whether another attempt follows a failed one, and how long to wait.
///
/// `delay_after(attempt)` is asked after attempt number `attempt` (1-based)
/// produced nothing usable: `Some(delay)` means sleep then try again, `None`
/// means give up. Tests inject a zero-delay policy so retry logic runs
/// without wall-clock time.
pub trait RetryPolicy: Send + Sync {
    fn delay_after(&self, attempt: u32) -> Option<Duration>;
}

/// Fixed attempt count with a fixed pause between attempts.
///
/// Not a backoff curve: the upstream's observed failure mode is transient
/// empty responses, not rate-limit storms.
pub struct FixedDelay {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }
}

impl RetryPolicy for FixedDelay {
    fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.delay)
        } else {
            None
        }
    }
}
