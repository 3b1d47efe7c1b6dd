//! Exponential backoff for transient store failures.
//!
//! Only lock contention while the store is opening or migrating is retried.
//! Business errors surface on the first attempt.

use std::path::Path;
use std::time::Duration;

use crate::db;
use crate::error::is_busy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
///
/// `sleep` is injected so tests can observe the schedule without waiting.
///
/// # Errors
///
/// Returns the last error from `op`.
pub fn retry_with_backoff<T, E>(
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut sleep: impl FnMut(Duration),
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && is_transient(&err) => {
                let delay = policy.delay_after(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis(), "transient failure, retrying");
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Open the task store, retrying while another process holds the lock.
///
/// # Errors
///
/// Returns the last open error once the policy is exhausted, or the first
/// non-transient error.
pub fn open_store_with_retry(
    path: &Path,
    policy: &RetryPolicy,
) -> anyhow::Result<rusqlite::Connection> {
    retry_with_backoff(
        policy,
        |err: &anyhow::Error| {
            err.chain()
                .filter_map(|cause| cause.downcast_ref::<rusqlite::Error>())
                .any(is_busy)
        },
        std::thread::sleep,
        |_| db::open_store(path),
    )
}
