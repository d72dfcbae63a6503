//! Retry wrapper for single remote read/simulate operations.
//! The only place failures from the ledger or the identity service are
//! retried — callers above treat a wrapped call as best-effort single-shot.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::{RATE_LIMIT_FLOOR_SECS, RETRY_BASE_DELAY_MS, RETRY_MAX_ATTEMPTS};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Minimum wait after a rate-limit classified failure, regardless of the
    /// exponential schedule.
    pub rate_limit_floor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            rate_limit_floor: Duration::from_secs(RATE_LIMIT_FLOOR_SECS),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: `base * 2^attempt` plus up to 50%
    /// jitter, floored for rate-limit failures. Jitter keeps concurrent
    /// per-wallet pipelines from hammering the provider in lockstep.
    fn delay_after(&self, attempt: u32, rate_limited: bool) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let jitter_ms = rand::thread_rng().gen_range(0..=exp.as_millis().max(1) as u64 / 2);
        let delay = exp + Duration::from_millis(jitter_ms);
        if rate_limited {
            delay.max(self.rate_limit_floor)
        } else {
            delay
        }
    }
}

/// Invoke `op` up to `policy.max_attempts` times with exponential backoff.
/// Exhausting attempts surfaces the last error.
pub async fn with_retries<T, F, Fut>(op_name: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<AppError> = None;

    for attempt in 0..policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let remaining = policy.max_attempts - attempt - 1;
                if remaining == 0 {
                    warn!("{op_name}: attempt {} failed, giving up: {e}", attempt + 1);
                    last_err = Some(e);
                    break;
                }
                let delay = policy.delay_after(attempt, e.is_rate_limit());
                debug!(
                    "{op_name}: attempt {} failed ({e}), retrying in {:.1}s",
                    attempt + 1,
                    delay.as_secs_f64(),
                );
                last_err = Some(e);
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::Ledger(format!("{op_name}: no attempts made"))))
}
