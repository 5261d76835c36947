//! API client composing rate limiting, authentication, and retry
//!
//! Every request runs: acquire a rate-limiter token → obtain a valid access
//! token (refresh-if-expired through the shared refresh) → issue the call →
//! on HTTP 401 force one unconditional refresh and retry once → decode the
//! JSON envelope. The whole attempt is wrapped in the retry executor so 429
//! and transient failures back off and re-enter the same path.

use std::sync::Arc;
use std::time::Duration;

use larkdown_common::resilience::{RateLimiter, RateLimiterConfig, RetryConfig, RetryExecutor};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::errors::ApiError;
use super::AccessTokenProvider;
use crate::config::{Region, SyncSettings};

/// JSON envelope wrapping every API response; `code` is the application
/// status, distinct from the HTTP status.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the OpenAPI surface.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Admission control shared by all calls through this client.
    pub rate_limit: RateLimiterConfig,
    /// Retry budgets for 429/transient failures.
    pub retry: RetryConfig,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: Region::default().api_base_url().to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: RateLimiterConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ApiClientConfig {
    /// Derive the client configuration from sync settings.
    #[must_use]
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            base_url: settings.region.api_base_url().to_string(),
            timeout: settings.request_timeout,
            rate_limit: settings.rate_limit.clone(),
            retry: settings.retry.clone(),
        }
    }
}

/// Authenticated, rate-limited, retrying HTTP client.
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth: Arc<dyn AccessTokenProvider>,
    limiter: RateLimiter,
    retry: RetryExecutor,
}

impl ApiClient {
    /// Create a client.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the HTTP client or rate limiter
    /// cannot be constructed.
    pub fn new(
        config: ApiClientConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;

        let limiter = RateLimiter::with_config(config.rate_limit).map_err(ApiError::Config)?;
        config.retry.validate().map_err(ApiError::Config)?;

        Ok(Self {
            http,
            base_url: config.base_url,
            auth,
            limiter,
            retry: RetryExecutor::new(config.retry),
        })
    }

    /// Execute a request against `path`, decoding the envelope into `T`.
    ///
    /// # Errors
    /// [`ApiError::Auth`] when no usable token can be obtained,
    /// [`ApiError::Api`] for transport-status or application-code
    /// rejections, [`ApiError::Network`] for transport failures. Retryable
    /// failures (429, 5xx, network) are absorbed up to the configured
    /// budgets before the final failure is rethrown unchanged.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        self.retry.execute(|| self.attempt(method.clone(), &url, body.as_ref())).await
    }

    /// Execute a GET request.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await
    }

    /// Execute a POST request with a JSON body.
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// One rate-limited, authenticated attempt.
    async fn attempt<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        self.limiter.acquire().await;

        let token = self.auth.access_token().await?;
        let response = self.send(method.clone(), url, body, &token).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            // The server may have revoked a token that still looks valid
            // locally; refresh unconditionally and retry exactly once.
            warn!("received HTTP 401, forcing token refresh");
            let token = self.auth.force_refresh().await?;
            self.send(method, url, body, &token).await?
        } else {
            response
        };

        Self::decode(response).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<reqwest::Response, ApiError> {
        debug!(%method, %url, "sending request");

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // Error bodies are usually envelopes too; surface the
            // application code when one is present.
            let (code, message) = match serde_json::from_str::<Envelope<Value>>(&text) {
                Ok(envelope) if !envelope.msg.is_empty() => (envelope.code, envelope.msg),
                Ok(envelope) => (envelope.code, text),
                Err(_) => (-1, text),
            };
            return Err(ApiError::Api { status: status.as_u16(), code, message });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("unparseable response body: {e}")))?;

        if envelope.code != 0 {
            return Err(ApiError::Api {
                status: status.as_u16(),
                code: envelope.code,
                message: envelope.msg,
            });
        }

        envelope.data.ok_or_else(|| ApiError::Network("response envelope missing data".to_string()))
    }
}
