//! Readiness polling with exponential backoff
//!
//! Resource implementations must not return from `create`/`update` before
//! the object is usable. [`wait_until`] is the shared helper for that.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,

    /// Initial delay between attempts
    pub initial_delay: Duration,

    /// Maximum delay between attempts
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given zero-based attempt, never above
    /// `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

/// Poll `check` until it reports `true`.
///
/// Errors from `check` abort immediately; running out of attempts is a
/// [`CloudError::Timeout`].
pub async fn wait_until<F, Fut>(config: &RetryConfig, what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 0..config.max_attempts {
        if check().await? {
            return Ok(());
        }

        if attempt + 1 < config.max_attempts {
            let delay = config.delay_for_attempt(attempt);
            tracing::debug!("{} not ready, retrying in {:?}", what, delay);
            sleep(delay).await;
        }
    }

    Err(CloudError::Timeout(format!(
        "{} not ready after {} attempts",
        what, config.max_attempts
    )))
}
