//! Attempt envelope with linear backoff

use super::{ErrorKind, PipelineResult};
use crate::metrics::record_attempt;
use crate::sleep::Sleeper;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// How many attempts to make and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1
    pub max_attempts: u32,
    /// Attempt `i` (zero-based) waits `i * base_delay` first
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` below 1 is raised to 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before zero-based attempt `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_RETRIES,
            Duration::from_secs(crate::config::DEFAULT_RETRIES_DELAY_SECS),
        )
    }
}

/// Run `attempt` until it succeeds, fails fatally, or attempts run out
///
/// The closure receives the zero-based attempt index. Failures of non-final
/// attempts are logged; the final failure is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt: F,
) -> PipelineResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut index = 0;
    loop {
        let delay = policy.delay_for(index);
        if !delay.is_zero() {
            info!("Waiting {:?} before attempt #{}", delay, index + 1);
            sleeper.sleep(delay).await;
        }

        match attempt(index).await {
            Ok(value) => {
                record_attempt("success");
                return Ok(value);
            }
            Err(e) if e.kind() == ErrorKind::Fatal => {
                record_attempt("failed");
                error!("Iteration #{} failed with unretryable error: {}", index + 1, e);
                return Err(e);
            }
            Err(e) if index + 1 >= max_attempts => {
                record_attempt("failed");
                error!("Iteration #{} failed: {}", index + 1, e);
                return Err(e);
            }
            Err(e) => {
                record_attempt("retry");
                warn!("Iteration #{} failed: {}", index + 1, e);
                index += 1;
            }
        }
    }
}
