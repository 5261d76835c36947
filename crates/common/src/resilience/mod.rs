//! Resilience patterns for the API call path
//!
//! This module provides the two admission/recovery mechanisms the sync
//! engine composes around every request:
//! - **Rate limiting**: an asynchronous token bucket whose `acquire()` never
//!   fails, only suspends. This is the system's sole backpressure mechanism.
//! - **Retry logic**: exponential backoff with jitter, with independent
//!   attempt budgets for rate-limited and transient failures.
//!
//! Both are generic over the caller's error type; classification happens
//! through the [`Classify`] trait at the seam.

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder};
pub use retry::{Classify, RetryClass, RetryConfig, RetryConfigBuilder, RetryExecutor};
