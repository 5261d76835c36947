//! HTTP client for the authorization server's token endpoints
//!
//! Builds the interactive authorization URL and performs the code exchange
//! and refresh grants. Responses arrive as `{code, msg, data}` envelopes; a
//! non-zero application code is a rejection even on HTTP 200.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::pkce::PkceChallenge;
use super::traits::TokenEndpoint;
use super::types::{AuthConfig, TokenResponse};
use super::AuthError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Application-level envelope wrapping token endpoint responses.
#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<TokenResponse>,
}

/// Client for the platform's token exchange and refresh endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: AuthConfig,
    http: Client,
}

impl AuthClient {
    /// Create a client for the given endpoints.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] if the configuration is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        config.validate().map_err(AuthError::Config)?;

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    /// The configured redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    /// Build the interactive authorization URL carrying the PKCE challenge
    /// and anti-forgery state.
    #[must_use]
    pub fn build_authorization_url(&self, challenge: &PkceChallenge) -> String {
        let params = [
            ("app_id", self.config.app_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("state", challenge.state.as_str()),
            ("code_challenge", challenge.code_challenge.as_str()),
            ("code_challenge_method", challenge.challenge_method()),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.authorize_url, query)
    }

    /// Send a grant request and unwrap the token envelope.
    async fn post_grant(
        &self,
        url: &str,
        body: serde_json::Value,
        reject: fn(String) -> AuthError,
    ) -> Result<TokenResponse, AuthError> {
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(reject(format!("HTTP {status}: {text}")));
        }

        let envelope: AuthEnvelope = response
            .json()
            .await
            .map_err(|e| reject(format!("unparseable token response: {e}")))?;

        if envelope.code != 0 {
            return Err(reject(format!("application code {}: {}", envelope.code, envelope.msg)));
        }

        envelope.data.ok_or_else(|| reject("token response missing data".to_string()))
    }
}

#[async_trait]
impl TokenEndpoint for AuthClient {
    #[instrument(skip(self, code, verifier))]
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse, AuthError> {
        debug!("exchanging authorization code for tokens");

        let body = json!({
            "grant_type": "authorization_code",
            "code": code,
            "code_verifier": verifier,
            "app_id": self.config.app_id,
            "redirect_uri": self.config.redirect_uri,
        });

        self.post_grant(&self.config.token_url, body, AuthError::ExchangeFailed).await
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        debug!("refreshing access token");

        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "app_id": self.config.app_id,
        });

        self.post_grant(&self.config.refresh_url, body, AuthError::RefreshFailed).await
    }
}
