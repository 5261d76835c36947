//! OAuth 2.0 PKCE authentication
//!
//! Everything needed to obtain and keep a usable access token:
//! - PKCE challenge generation and constant-time state validation
//! - Token exchange/refresh HTTP client
//! - Two-tier (volatile/durable) token persistence behind a trait
//! - Token manager with a single-flight refresh: concurrent callers awaiting
//!   a fresh token share exactly one in-flight refresh operation
//! - Interactive authorization service driving an injected web-auth flow

pub mod client;
pub mod manager;
pub mod pkce;
pub mod service;
pub mod store;
pub mod traits;
pub mod types;

pub use client::AuthClient;
pub use manager::TokenManager;
pub use pkce::PkceChallenge;
pub use service::AuthService;
pub use store::{FileTokenStore, MemoryTokenStore, TieredTokenStore};
pub use traits::{TokenEndpoint, TokenStore, WebAuthFlow, WebAuthOutcome};
pub use types::{AuthConfig, TokenRecord, TokenResponse};

use thiserror::Error;

/// Authentication failures. Each interactive-flow failure kind is distinct
/// and reportable so callers can tell a deliberate cancel from an error.
///
/// All variants are terminal for the current session: recovery is a new
/// login, not a retry.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The web authorization flow returned no redirect (user closed it).
    #[error("authorization cancelled")]
    Cancelled,

    /// Returned anti-forgery state did not match the value we sent.
    #[error("authorization state mismatch")]
    StateMismatch,

    /// Redirect arrived without an authorization code.
    #[error("authorization redirect missing code")]
    MissingCode,

    /// Code-for-token exchange was rejected.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Refresh-token grant was rejected.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// No usable token pair exists; a login is required.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Token store operation failed.
    #[error("token store error: {0}")]
    Store(String),

    /// HTTP transport failure while talking to the authorization server.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid authentication configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<String> for AuthError {
    fn from(err: String) -> Self {
        Self::Store(err)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
