//! Traits for authentication seams
//!
//! These traits abstract the external collaborators of the auth module so
//! they can be injected and mocked: the interactive web authorization
//! primitive, the token persistence tiers, and the token endpoints
//! themselves.

use async_trait::async_trait;

use super::types::{TokenRecord, TokenResponse};
use super::AuthError;

/// Outcome of the interactive web authorization primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebAuthOutcome {
    /// The flow completed and returned the full redirect URL.
    Redirect(String),

    /// The flow produced no redirect (user dismissed it).
    Cancelled,
}

/// Platform-provided "launch web authorization flow" primitive.
///
/// Opens the interactive authorization URL and resolves once the user
/// either completes the flow (yielding the redirect URL) or abandons it.
/// Cancellation is an outcome, not an error.
#[async_trait]
pub trait WebAuthFlow: Send + Sync {
    /// Run the interactive flow for the given authorization URL.
    async fn authorize(&self, authorization_url: &str) -> WebAuthOutcome;
}

/// Persisted key-value storage for the single well-known token record.
///
/// Implementations may be volatile (in-memory) or durable (disk); the
/// two-tier composition lives in [`super::store::TieredTokenStore`].
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch the stored record, if any.
    ///
    /// # Errors
    /// Returns error if the underlying storage fails (not if empty).
    async fn get(&self) -> Result<Option<TokenRecord>, String>;

    /// Store or replace the record.
    ///
    /// # Errors
    /// Returns error if persistence fails.
    async fn set(&self, record: &TokenRecord) -> Result<(), String>;

    /// Remove the record (logout).
    ///
    /// # Errors
    /// Returns error if deletion fails.
    async fn remove(&self) -> Result<(), String>;
}

/// Token exchange/refresh endpoints of the authorization server.
///
/// Abstracting the HTTP client lets the token manager be exercised with
/// counting mocks in tests.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code (plus its PKCE verifier) for tokens.
    ///
    /// # Errors
    /// Returns [`AuthError::ExchangeFailed`] on rejection, transport errors
    /// otherwise.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse, AuthError>;

    /// Obtain a fresh token pair from a refresh token.
    ///
    /// # Errors
    /// Returns [`AuthError::RefreshFailed`] on rejection, transport errors
    /// otherwise.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}
