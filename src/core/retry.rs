//! Retry helper for transient failures in async operations
//!
//! Used around Elasticsearch requests, where timeouts and 5xx responses from a
//! busy cluster are common during long scans.

use std::time::Duration;
use tokio::time::sleep;

/// Retry policy with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Delay before the first retry
    pub delay: Duration,
    /// Factor applied to the delay after each failed retry
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            multiplier: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt as u32);
        self.delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, the policy is exhausted, or it fails
/// with an error `is_retryable` rejects
///
/// ```rust
/// use stac_stocktake::core::retry::{retry_async_if, RetryPolicy};
///
/// # async fn example() -> Result<String, String> {
/// let pit = retry_async_if(
///     "open_point_in_time",
///     RetryPolicy::default(),
///     |error: &String| error.contains("timeout"),
///     || async { Ok::<String, String>("pit-id".to_string()) },
/// )
/// .await?;
/// # Ok(pit)
/// # }
/// ```
pub async fn retry_async_if<F, T, E, Fut, P>(
    operation_name: &str,
    policy: RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts || !is_retryable(&error) {
                    return Err(error);
                }
                let delay = policy.delay_for(attempt - 1);
                log::debug!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    max_attempts,
                    delay,
                    error
                );
                sleep(delay).await;
            }
        }
    }
}
