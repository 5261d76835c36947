//! Token-bucket rate limiting for outbound requests
//!
//! The bucket refills lazily: on each access the elapsed wall-clock time
//! decides how many whole refill intervals have passed, and each passed
//! interval restores the bucket to full capacity ("full bucket every T",
//! not a continuous trickle). `acquire()` never fails; when the bucket is
//! empty it suspends until the next refill instant and rechecks.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Configuration for the token-bucket rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of acquisitions per refill interval
    pub capacity: u32,
    /// Interval after which the bucket refills to full capacity
    pub refill_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { capacity: 5, refill_interval: Duration::from_secs(1) }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".to_string());
        }
        if self.refill_interval.is_zero() {
            return Err("refill_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for RateLimiterConfig
#[derive(Debug, Default)]
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterConfigBuilder {
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default() }
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.config.refill_interval = interval;
        self
    }

    pub fn build(self) -> Result<RateLimiterConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Bucket counters; guarded by one async mutex since acquisition must read
/// and write them together across a suspension point.
#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Asynchronous token-bucket rate limiter.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use larkdown_common::resilience::RateLimiter;
///
/// # async fn example() -> Result<(), String> {
/// let limiter = RateLimiter::new(5, Duration::from_secs(1))?;
/// limiter.acquire().await; // suspends when the bucket is empty
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Create a limiter allowing `capacity` acquisitions per
    /// `refill_interval`.
    ///
    /// # Errors
    /// Returns error on zero capacity or interval.
    pub fn new(capacity: u32, refill_interval: Duration) -> Result<Self, String> {
        Self::with_config(RateLimiterConfig { capacity, refill_interval })
    }

    /// Create a limiter from a validated configuration.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid.
    pub fn with_config(config: RateLimiterConfig) -> Result<Self, String> {
        config.validate()?;

        Ok(Self {
            state: Mutex::new(BucketState {
                tokens: config.capacity,
                last_refill: Instant::now(),
            }),
            config,
        })
    }

    /// Restore the bucket based on whole elapsed intervals.
    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        let interval_ms = self.config.refill_interval.as_millis();
        let intervals = elapsed.as_millis() / interval_ms;

        if intervals > 0 {
            state.tokens = self.config.capacity;
            // Advance by whole intervals so partial progress toward the next
            // refill is not lost.
            state.last_refill += Duration::from_millis((interval_ms * intervals) as u64);
            debug!(tokens = state.tokens, "rate limiter refilled");
        }
    }

    /// Acquire one token, suspending until one is available.
    ///
    /// Never fails. When the bucket is empty the caller sleeps until the
    /// next refill instant and rechecks; if timing jitter leaves the bucket
    /// still empty after that wait, the caller waits one additional full
    /// interval instead of busy-looping.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);

                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }

                let next_refill = state.last_refill + self.config.refill_interval;
                let now = Instant::now();
                if next_refill > now {
                    next_refill - now
                } else {
                    self.config.refill_interval
                }
            };

            debug!(?wait, "rate limiter exhausted, suspending");
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available (after a lazy refill).
    pub async fn available(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for resilience::rate_limiter.
    use super::*;

    /// Validates `RateLimiter::acquire` behavior for the burst-within-budget
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `capacity` acquisitions complete without any suspension.
    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new(3, Duration::from_millis(100)).unwrap();
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(Instant::now() - start, Duration::ZERO);
        assert_eq!(limiter.available().await, 0);
    }

    /// Validates that the limiter never permits more than `capacity`
    /// acquisitions within one refill interval.
    ///
    /// Assertions:
    /// - Ensures the (capacity + 1)-th acquisition waits a full interval.
    /// - Ensures 2×capacity + 1 acquisitions span at least two intervals.
    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_capacity_per_interval() {
        let capacity = 4u32;
        let interval = Duration::from_millis(250);
        let limiter = RateLimiter::new(capacity, interval).unwrap();
        let start = Instant::now();

        for _ in 0..capacity {
            limiter.acquire().await;
        }
        assert!(Instant::now() - start < interval);

        // One more must cross into the next interval
        limiter.acquire().await;
        assert!(Instant::now() - start >= interval);

        // Drain the rest of the refilled bucket and one beyond
        for _ in 0..capacity {
            limiter.acquire().await;
        }
        assert!(Instant::now() - start >= interval * 2);
    }

    /// Validates `RateLimiter::refill` behavior for the whole-bucket refill
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a single elapsed interval restores full capacity, not an
    ///   increment.
    #[tokio::test(start_paused = true)]
    async fn test_refill_restores_full_capacity() {
        let limiter = RateLimiter::new(5, Duration::from_millis(100)).unwrap();

        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.available().await, 0);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(limiter.available().await, 5);
    }

    /// Validates `RateLimiter::refill` behavior for the long-idle scenario.
    ///
    /// Assertions:
    /// - Ensures many elapsed intervals cap the bucket at capacity.
    #[tokio::test(start_paused = true)]
    async fn test_long_idle_caps_at_capacity() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50)).unwrap();
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.available().await, 2);
    }

    /// Validates `RateLimiterConfig` behavior for the validation scenario.
    ///
    /// Assertions:
    /// - Ensures zero capacity and zero interval are rejected.
    #[test]
    fn test_config_validation() {
        assert!(RateLimiterConfig::builder().capacity(0).build().is_err());
        assert!(RateLimiterConfig::builder()
            .refill_interval(Duration::ZERO)
            .build()
            .is_err());
        assert!(RateLimiterConfig::builder()
            .capacity(10)
            .refill_interval(Duration::from_millis(200))
            .build()
            .is_ok());
    }
}
