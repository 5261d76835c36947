//! API-specific error types
//!
//! Three failure families, matching what callers need to distinguish:
//! authentication (terminal, re-login), API rejection (HTTP status plus the
//! application code so transport failure and application rejection stay
//! distinguishable), and network transport. Classification for the retry
//! executor lives here too.

use larkdown_common::auth::AuthError;
use larkdown_common::resilience::{Classify, RetryClass};
use thiserror::Error;

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed; requires re-authentication.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The platform rejected the request: non-2xx transport status, or a
    /// 2xx envelope carrying a non-zero application code.
    #[error("api error: HTTP {status}, code {code}: {message}")]
    Api { status: u16, code: i64, message: String },

    /// Transport-level failure (connection, TLS, malformed body).
    #[error("network error: {0}")]
    Network(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether this is a deliberate user cancellation rather than a fault.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Auth(AuthError::Cancelled))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl Classify for ApiError {
    fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status: 429, .. } => RetryClass::RateLimited,
            Self::Api { status, .. } if *status >= 500 => RetryClass::Transient,
            Self::Network(_) => RetryClass::Transient,
            // Auth failures, 4xx rejections, and config errors are fatal.
            _ => RetryClass::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for api::errors.
    use super::*;

    /// Validates `ApiError::retry_class` behavior for the classification
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms 429 is rate-limited, 5xx/network transient, and
    ///   everything else fatal.
    #[test]
    fn test_retry_classification() {
        let rate_limited = ApiError::Api { status: 429, code: 99991400, message: String::new() };
        assert_eq!(rate_limited.retry_class(), RetryClass::RateLimited);

        let server = ApiError::Api { status: 503, code: -1, message: String::new() };
        assert_eq!(server.retry_class(), RetryClass::Transient);

        let network = ApiError::Network("connection reset".to_string());
        assert_eq!(network.retry_class(), RetryClass::Transient);

        let client = ApiError::Api { status: 400, code: 1770001, message: String::new() };
        assert_eq!(client.retry_class(), RetryClass::Fatal);

        let rejected = ApiError::Api { status: 200, code: 1770002, message: String::new() };
        assert_eq!(rejected.retry_class(), RetryClass::Fatal);

        let auth = ApiError::Auth(AuthError::NotAuthenticated);
        assert_eq!(auth.retry_class(), RetryClass::Fatal);
    }

    /// Validates `ApiError::is_cancelled` behavior for the cancellation
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures only the cancelled auth outcome reports as cancellation.
    #[test]
    fn test_cancellation_is_distinguishable() {
        assert!(ApiError::Auth(AuthError::Cancelled).is_cancelled());
        assert!(!ApiError::Auth(AuthError::NotAuthenticated).is_cancelled());
        assert!(!ApiError::Network("reset".to_string()).is_cancelled());
    }
}
