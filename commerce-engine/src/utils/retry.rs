//! Bounded exponential backoff for duplicate-key races
//!
//! Only errors for which [`EngineError::is_transient`] holds are retried;
//! everything else propagates on the first failure.

use crate::core::Config;
use crate::error::{EngineError, EngineResult};
use std::future::Future;
use std::time::Duration;

/// Upper bound on a single backoff delay
const MAX_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_attempts, config.retry_base_delay_ms)
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.checked_pow(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(MAX_DELAY_MS))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 50)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget runs out
///
/// An exhausted budget surfaces as [`EngineError::TransientConflict`].
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        operation = operation,
                        attempts = attempt,
                        error = %e,
                        "Retry budget exhausted"
                    );
                    return Err(EngineError::TransientConflict(format!(
                        "{} failed after {} attempts: {}",
                        operation, attempt, e
                    )));
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    operation = operation,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient conflict, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
