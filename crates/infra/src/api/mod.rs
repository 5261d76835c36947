//! Authenticated, rate-limited API access
//!
//! [`ApiClient`] composes the rate limiter, the token provider, and the
//! retry executor around every request. [`docs`] adds the typed document
//! endpoints and the wire payload mapping on top of it.

pub mod client;
pub mod docs;
pub mod errors;

pub use client::{ApiClient, ApiClientConfig};
pub use docs::{block_to_wire, CreatedBlock};
pub use errors::ApiError;

use async_trait::async_trait;
use larkdown_common::auth::traits::{TokenEndpoint, TokenStore};
use larkdown_common::auth::{AuthError, TokenManager};

/// Source of bearer tokens for API calls.
///
/// Abstracts the token manager so the client can be exercised with static
/// tokens in tests. `force_refresh` exists for the HTTP 401 path: the
/// server may have revoked a token that still looks valid locally.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A currently valid access token (refresh-if-expired).
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Refresh unconditionally and return the new access token.
    async fn force_refresh(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl<C: TokenEndpoint + 'static, S: TokenStore + 'static> AccessTokenProvider
    for TokenManager<C, S>
{
    async fn access_token(&self) -> Result<String, AuthError> {
        TokenManager::access_token(self).await
    }

    async fn force_refresh(&self) -> Result<String, AuthError> {
        TokenManager::force_refresh(self).await.map(|record| record.access_token)
    }
}
