//! Exponential-backoff retry for transient API failures
//!
//! The executor keeps two independent attempt counters: one for
//! rate-limited failures (HTTP 429) and one for transient server/network
//! failures (5xx, transport). Each class backs off
//! `base × 2^attempt × jitter[0.5, 1.0)` with its own base delay and budget,
//! so alternating failure kinds can consume up to the sum of both budgets.
//! Jitter avoids synchronized retry storms across concurrent callers. All
//! other failures are fatal immediately and the final exhausted failure is
//! rethrown unchanged.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// How a failure should be treated by the retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// The server asked us to slow down (HTTP 429).
    RateLimited,
    /// A transient server or transport failure (5xx, network).
    Transient,
    /// Not worth retrying; rethrow immediately.
    Fatal,
}

/// Classification seam implemented by retryable error types.
pub trait Classify {
    /// Decide the retry class of this failure.
    fn retry_class(&self) -> RetryClass;
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Base delay for rate-limited backoff
    pub rate_limited_base: Duration,
    /// Maximum retries after rate-limited failures
    pub rate_limited_max_retries: u32,
    /// Base delay for transient backoff
    pub transient_base: Duration,
    /// Maximum retries after transient failures
    pub transient_max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rate_limited_base: Duration::from_millis(1000),
            rate_limited_max_retries: 4,
            transient_base: Duration::from_millis(2000),
            transient_max_retries: 3,
        }
    }
}

impl RetryConfig {
    /// Create a new configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limited_base.is_zero() || self.transient_base.is_zero() {
            return Err("backoff base delays must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for RetryConfig
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn rate_limited_backoff(mut self, base: Duration, max_retries: u32) -> Self {
        self.config.rate_limited_base = base;
        self.config.rate_limited_max_retries = max_retries;
        self
    }

    pub fn transient_backoff(mut self, base: Duration, max_retries: u32) -> Self {
        self.config.transient_base = base;
        self.config.transient_max_retries = max_retries;
        self
    }

    pub fn build(self) -> Result<RetryConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Retry executor with independent rate-limited and transient budgets.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryExecutor {
    /// Create an executor with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation, retrying per the failure classification.
    ///
    /// A failure class whose budget is exhausted rethrows the final failure
    /// unchanged; fatal classifications rethrow at once.
    ///
    /// # Errors
    /// Returns the last failure when retries are exhausted or the failure
    /// is fatal.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut rate_limited_attempts = 0u32;
        let mut transient_attempts = 0u32;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    let retries = rate_limited_attempts + transient_attempts;
                    if retries > 0 {
                        debug!(retries, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let (attempts, max_retries, base) = match error.retry_class() {
                RetryClass::Fatal => {
                    debug!(%error, "failure is fatal, not retrying");
                    return Err(error);
                }
                RetryClass::RateLimited => (
                    &mut rate_limited_attempts,
                    self.config.rate_limited_max_retries,
                    self.config.rate_limited_base,
                ),
                RetryClass::Transient => (
                    &mut transient_attempts,
                    self.config.transient_max_retries,
                    self.config.transient_base,
                ),
            };

            if *attempts >= max_retries {
                warn!(%error, attempts = *attempts, "retry budget exhausted");
                return Err(error);
            }

            let delay = backoff_delay(base, *attempts);
            *attempts += 1;

            warn!(%error, ?delay, "operation failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

/// `base × 2^attempt`, scaled by a uniform jitter factor in `[0.5, 1.0)`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt));
    let jitter = rand::thread_rng().gen_range(0.5..1.0);
    exponential.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    //! Unit tests for resilience::retry.
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Error stub with a fixed classification.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError(RetryClass);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error ({:?})", self.0)
        }
    }

    impl Classify for TestError {
        fn retry_class(&self) -> RetryClass {
            self.0
        }
    }

    fn fast_executor() -> RetryExecutor {
        let config = RetryConfig::builder()
            .rate_limited_backoff(Duration::from_millis(10), 4)
            .transient_backoff(Duration::from_millis(20), 3)
            .build()
            .unwrap();
        RetryExecutor::new(config)
    }

    /// Validates `RetryExecutor::execute` behavior for the recover-within-
    /// budget scenario: k rate-limited failures (k < max) then success
    /// resolves after k + 1 invocations.
    ///
    /// Assertions:
    /// - Confirms the value is returned.
    /// - Confirms exactly `k + 1` invocations were made.
    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_recovers_after_k_failures() {
        let executor = fast_executor();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let k = 3u32; // < rate_limited_max_retries (4)

        let result = executor
            .execute(|| {
                let c = Arc::clone(&counter_clone);
                async move {
                    let count = c.fetch_add(1, Ordering::SeqCst);
                    if count < k {
                        Err(TestError(RetryClass::RateLimited))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(counter.load(Ordering::SeqCst), k + 1);
    }

    /// Validates `RetryExecutor::execute` behavior for the exhausted budget
    /// scenario: persistent rate-limited failures rethrow after
    /// `max_retries + 1` invocations.
    ///
    /// Assertions:
    /// - Confirms the final failure is rethrown unchanged.
    /// - Confirms exactly `max + 1` invocations were made.
    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_exhausts_budget() {
        let executor = fast_executor();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: Result<(), TestError> = executor
            .execute(|| {
                let c = Arc::clone(&counter_clone);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError(RetryClass::RateLimited))
                }
            })
            .await;

        assert_eq!(result, Err(TestError(RetryClass::RateLimited)));
        assert_eq!(counter.load(Ordering::SeqCst), 5, "4 retries + the initial attempt");
    }

    /// Validates `RetryExecutor::execute` behavior for the transient budget
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms transient failures get their own (smaller) budget.
    #[tokio::test(start_paused = true)]
    async fn test_transient_budget_is_independent() {
        let executor = fast_executor();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: Result<(), TestError> = executor
            .execute(|| {
                let c = Arc::clone(&counter_clone);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError(RetryClass::Transient))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 4, "3 retries + the initial attempt");
    }

    /// Validates `RetryExecutor::execute` behavior for the alternating
    /// failure-class scenario: the two counters are independent, so
    /// alternating failures can consume up to the sum of both budgets.
    ///
    /// Assertions:
    /// - Confirms `max429 + max5xx + 1` total invocations.
    #[tokio::test(start_paused = true)]
    async fn test_alternating_classes_consume_both_budgets() {
        let executor = fast_executor();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: Result<(), TestError> = executor
            .execute(|| {
                let c = Arc::clone(&counter_clone);
                async move {
                    let count = c.fetch_add(1, Ordering::SeqCst);
                    if count % 2 == 0 {
                        Err(TestError(RetryClass::RateLimited))
                    } else {
                        Err(TestError(RetryClass::Transient))
                    }
                }
            })
            .await;

        assert!(result.is_err());
        // 4 rate-limited retries + 3 transient retries + the final attempt
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    /// Validates `RetryExecutor::execute` behavior for the fatal failure
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a fatal failure is rethrown after a single invocation.
    #[tokio::test]
    async fn test_fatal_fails_immediately() {
        let executor = fast_executor();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: Result<(), TestError> = executor
            .execute(|| {
                let c = Arc::clone(&counter_clone);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError(RetryClass::Fatal))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    /// Validates `backoff_delay` behavior for the exponential-with-jitter
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures each delay lands in `[base × 2^n / 2, base × 2^n)`.
    #[test]
    fn test_backoff_delay_bounds() {
        let base = Duration::from_millis(1000);
        for attempt in 0..4 {
            let full = base * 2u32.pow(attempt);
            let delay = backoff_delay(base, attempt);
            assert!(delay >= full / 2, "attempt {attempt}: {delay:?} < {:?}", full / 2);
            assert!(delay < full, "attempt {attempt}: {delay:?} >= {full:?}");
        }
    }

    /// Validates `RetryConfig` behavior for the validation scenario.
    ///
    /// Assertions:
    /// - Ensures zero base delays are rejected.
    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::builder()
            .rate_limited_backoff(Duration::ZERO, 4)
            .build()
            .is_err());
        assert!(RetryConfig::builder()
            .transient_backoff(Duration::from_millis(1), 0)
            .build()
            .is_ok());
    }
}
