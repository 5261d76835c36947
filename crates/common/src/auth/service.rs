//! High-level authentication service
//!
//! Drives one interactive PKCE login end to end: challenge generation,
//! launching the injected web-auth flow, constant-time state validation,
//! code extraction, token exchange, and persistence. The PKCE verifier is
//! zeroized on every exit path, success or failure, as soon as it is no
//! longer needed.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use super::client::AuthClient;
use super::manager::TokenManager;
use super::pkce::{self, PkceChallenge};
use super::traits::{TokenEndpoint, TokenStore, WebAuthFlow, WebAuthOutcome};
use super::types::{now_ms, AuthConfig, TokenRecord};
use super::AuthError;

/// Authentication session: owns the client, the token manager, and the
/// injected interactive flow. No module-level auth state exists; everything
/// mutable lives behind this object.
pub struct AuthService<S: TokenStore + 'static> {
    client: Arc<AuthClient>,
    manager: TokenManager<AuthClient, S>,
    flow: Arc<dyn WebAuthFlow>,
}

impl<S: TokenStore + 'static> AuthService<S> {
    /// Create a service for the given endpoints, store, and web-auth flow.
    ///
    /// # Errors
    /// Returns [`AuthError::Config`] if the configuration is invalid.
    pub fn new(
        config: AuthConfig,
        store: Arc<S>,
        flow: Arc<dyn WebAuthFlow>,
    ) -> Result<Self, AuthError> {
        let client = AuthClient::new(config)?;
        let manager = TokenManager::new(client.clone(), store);

        Ok(Self { client: Arc::new(client), manager, flow })
    }

    /// Load persisted tokens on startup.
    ///
    /// # Errors
    /// Returns error if the token store fails.
    pub async fn initialize(&self) -> Result<bool, AuthError> {
        self.manager.initialize().await
    }

    /// Run the interactive PKCE login flow.
    ///
    /// # Errors
    /// Each failure kind is distinct: [`AuthError::Cancelled`] when the flow
    /// returns no redirect, [`AuthError::StateMismatch`] on anti-forgery
    /// failure, [`AuthError::MissingCode`] when the redirect carries no
    /// code, and [`AuthError::ExchangeFailed`] when the exchange is
    /// rejected.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<TokenRecord, AuthError> {
        let challenge = PkceChallenge::generate();
        let authorization_url = self.client.build_authorization_url(&challenge);

        info!("launching web authorization flow");
        let redirect = match self.flow.authorize(&authorization_url).await {
            WebAuthOutcome::Redirect(url) => url,
            // Deliberate cancel; the challenge drops here and the verifier
            // is zeroized with it.
            WebAuthOutcome::Cancelled => return Err(AuthError::Cancelled),
        };

        let (code, returned_state) = parse_redirect(&redirect)?;

        let state_ok = returned_state
            .as_deref()
            .is_some_and(|returned| pkce::validate_state(&challenge.state, returned));
        if !state_ok {
            warn!("authorization state mismatch, aborting login");
            return Err(AuthError::StateMismatch);
        }

        let code = code.ok_or(AuthError::MissingCode)?;

        let response = self.client.exchange_code(&code, &challenge.code_verifier).await;
        // The verifier is single-use: clear it before looking at the result.
        drop(challenge);
        let response = response?;

        let record = TokenRecord::from_response(response, now_ms());
        self.manager.store_record(record.clone()).await?;

        info!("login completed");
        Ok(record)
    }

    /// Get a usable access token (refresh-if-expired, single-flight).
    ///
    /// # Errors
    /// Propagates manager/refresh failures.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.manager.access_token().await
    }

    /// Whether a token pair is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.manager.is_authenticated().await
    }

    /// Clear the token pair (logout).
    ///
    /// # Errors
    /// Returns error if the store deletion fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.manager.logout().await
    }

    /// Token manager for advanced composition (API clients).
    #[must_use]
    pub fn manager(&self) -> &TokenManager<AuthClient, S> {
        &self.manager
    }
}

/// Extract `code` and `state` query parameters from the redirect URL.
fn parse_redirect(redirect: &str) -> Result<(Option<String>, Option<String>), AuthError> {
    let url = Url::parse(redirect)
        .map_err(|e| AuthError::Config(format!("unparseable redirect URL: {e}")))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    Ok((code, state))
}
