//! OAuth 2.0 types and configuration
//!
//! Unified data structures for tokens and the authorization-server
//! endpoints. Timestamps are absolute epoch milliseconds so a record
//! round-trips through the durable store without recomputation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Access tokens are treated as expired this many milliseconds before their
/// actual expiry timestamp, absorbing clock skew and request latency.
pub const TOKEN_EXPIRY_SKEW_MS: i64 = 60_000;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// OAuth access/refresh token pair with absolute expiry timestamps.
///
/// Created on successful exchange, replaced in place by refresh, destroyed
/// on logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer token for API authentication.
    pub access_token: String,

    /// Token used to obtain new access tokens without user interaction.
    pub refresh_token: String,

    /// Absolute access-token expiry (epoch milliseconds).
    pub expires_at_ms: i64,

    /// Absolute refresh-token expiry (epoch milliseconds).
    pub refresh_expires_at_ms: i64,
}

impl TokenRecord {
    /// Build a record from a token-endpoint response, anchoring the relative
    /// lifetimes at `now_ms`.
    #[must_use]
    pub fn from_response(response: TokenResponse, now_ms: i64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at_ms: now_ms + response.expires_in.saturating_mul(1000),
            refresh_expires_at_ms: now_ms + response.refresh_expires_in.saturating_mul(1000),
        }
    }

    /// Whether the access token is expired at `now_ms`.
    ///
    /// A token is usable only while `now < expires_at - 60_000 ms`; at
    /// exactly the skew boundary it already counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms - TOKEN_EXPIRY_SKEW_MS
    }

    /// Whether the access token is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }

    /// Whether the refresh token itself is still usable at `now_ms`.
    #[must_use]
    pub fn can_refresh_at(&self, now_ms: i64) -> bool {
        now_ms < self.refresh_expires_at_ms
    }

    /// Whether the refresh token itself is still usable right now.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.can_refresh_at(now_ms())
    }
}

/// Token payload returned by the exchange and refresh endpoints.
///
/// Lifetimes are relative seconds; [`TokenRecord::from_response`] anchors
/// them to absolute timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Authorization-server endpoints and client identity.
///
/// The platform identifies integrations by an `app_id` rather than a client
/// secret; PKCE binds the authorization code to this process instead.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Application identifier registered with the platform.
    pub app_id: String,

    /// Redirect URI the web flow returns to.
    pub redirect_uri: String,

    /// Interactive authorization page URL.
    pub authorize_url: String,

    /// Code-for-token exchange endpoint.
    pub token_url: String,

    /// Refresh-token grant endpoint.
    pub refresh_url: String,
}

impl AuthConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(
        app_id: String,
        redirect_uri: String,
        authorize_url: String,
        token_url: String,
        refresh_url: String,
    ) -> Self {
        Self { app_id, redirect_uri, authorize_url, token_url, refresh_url }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.is_empty() {
            return Err("app_id must not be empty".to_string());
        }
        if self.redirect_uri.is_empty() {
            return Err("redirect_uri must not be empty".to_string());
        }
        for (name, value) in [
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("refresh_url", &self.refresh_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(format!("{name} must be an absolute http(s) URL"));
            }
        }
        Ok(())
    }
}
