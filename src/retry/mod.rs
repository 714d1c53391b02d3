//! Bounded retries with exponential backoff
//!
//! Wraps any fallible async operation. Attempts run strictly one after the
//! other; the delay before retry `k` (counting from 0) is
//! `base_delay * 2^k`. The sleeper is pluggable so tests can record delays
//! instead of waiting.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);

/// Final failure of a retried operation
#[derive(Error, Debug)]
#[error("refresh failed after {attempts} attempts: {source}")]
pub struct RetryExhausted<E: std::error::Error + 'static> {
    /// Number of times the operation ran
    pub attempts: u32,
    /// Error of the last attempt
    #[source]
    pub source: E,
}

/// Something that can wait
#[async_trait]
pub trait Sleep: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.checked_pow(retry).unwrap_or(u32::MAX))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

/// Runs an operation until it succeeds or the retry budget is spent
#[derive(Clone)]
pub struct RetryingRefresher {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleep>,
}

impl RetryingRefresher {
    /// Create a refresher sleeping in real time
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleep))
    }

    /// Create a refresher with a custom sleeper
    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleep>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `operation`, retrying on error.
    ///
    /// Runs at most `max_retries + 1` times and returns the first success or
    /// the error of the last attempt.
    pub async fn refresh<F, Fut, T, E>(&self, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let mut retries = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(attempts = retries + 1, "Refresh succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) if retries < self.policy.max_retries => {
                    let delay = self.policy.delay(retries);
                    warn!(
                        attempt = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Refresh failed, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    retries += 1;
                }
                Err(error) => {
                    return Err(RetryExhausted {
                        attempts: retries + 1,
                        source: error,
                    });
                }
            }
        }
    }
}

impl Default for RetryingRefresher {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for RetryingRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingRefresher")
            .field("policy", &self.policy)
            .finish()
    }
}
