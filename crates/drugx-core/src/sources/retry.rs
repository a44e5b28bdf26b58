//! Bounded exponential-backoff retry for upstream calls.

use std::future::Future;
use std::time::Duration;

use super::{SourceError, SourceResult};

/// Retry budget for one upstream service.
///
/// Only transient failures (see [`SourceError::is_transient`]) are retried.
/// The wait after failed attempt `n` is `2^(n-1)` seconds clamped to
/// `[min_delay, max_delay]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Normalization service budget.
    pub const RXNORM: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(4), Duration::from_secs(10));
    /// Compound-synonym service budget.
    pub const PUBCHEM: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(8));
    /// Adverse-event service budget.
    pub const OPENFDA: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(8));

    pub const fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            min_delay,
            max_delay,
        }
    }

    /// Same attempt budget without any wait (for tests).
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Wait before the next try, after `attempt` (1-based) has failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_secs(exp).max(self.min_delay).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails non-transiently, or the budget runs out.
    pub async fn run<T, F, Fut>(&self, service: &'static str, mut op: F) -> SourceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        service,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!(service, attempts = attempt, error = %e, "Upstream retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
