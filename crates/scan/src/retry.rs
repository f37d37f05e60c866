//! Classification-driven retry around outbound calls.

use boxscan_provider::error::Result as ProviderResult;
use std::future::Future;
use std::time::Duration;

use crate::context::ScanContext;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Exponential backoff for transient provider failures.
///
/// Only [`Transient`](boxscan_provider::error::ErrorKind::Transient) errors
/// are retried, waiting `base_delay * 2^(attempt - 1)` before retry number
/// `attempt`. Everything else fails on the first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `request` until it succeeds, fails fatally, or retries run out.
    ///
    /// Every attempt is counted as an API call on `ctx`, and every failed
    /// attempt as an API error.
    pub async fn execute<T, F, Fut>(&self, ctx: &mut ScanContext, mut request: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt = 0;
        loop {
            ctx.record_api_call();
            let err = match request().await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            ctx.record_api_error();
            if !err.is_retryable() {
                tracing::warn!(error = %*err, attempt, "Request failed; not retrying");
                return Err(err);
            }
            if attempt >= self.max_retries {
                tracing::warn!(error = %*err, max_retries = self.max_retries, "Retries exhausted");
                return Err(err);
            }
            attempt += 1;
            let delay = self.delay_for(attempt);
            tracing::warn!(
                error = %*err,
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Transient failure; backing off",
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}
