//! Token manager with single-flight refresh
//!
//! Owns the cached token pair and serializes every mutation through one
//! shared in-flight refresh: the first caller needing a fresh token starts
//! the refresh and stores the pending operation, every caller (including the
//! starter) awaits that same operation, and the slot clears once it settles,
//! regardless of outcome. Without this, concurrent post-expiry requests
//! would race multiple refresh calls.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::traits::{TokenEndpoint, TokenStore};
use super::types::{now_ms, TokenRecord};
use super::AuthError;

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenRecord, AuthError>>>;

/// Manages the token pair lifecycle: load, cache, refresh, clear.
///
/// The token pair is the only cross-call mutable state in the system; all
/// mutation routes through the refresh critical section below.
pub struct TokenManager<C: TokenEndpoint + 'static, S: TokenStore + 'static> {
    endpoint: Arc<C>,
    store: Arc<S>,
    current: Arc<RwLock<Option<TokenRecord>>>,
    /// The single optional held refresh: create-and-store if absent, all
    /// callers await the same future, clear on settle.
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl<C: TokenEndpoint + 'static, S: TokenStore + 'static> Clone for TokenManager<C, S> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            store: Arc::clone(&self.store),
            current: Arc::clone(&self.current),
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<C: TokenEndpoint + 'static, S: TokenStore + 'static> TokenManager<C, S> {
    /// Create a new token manager.
    #[must_use]
    pub fn new(endpoint: C, store: Arc<S>) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            store,
            current: Arc::new(RwLock::new(None)),
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Load a previously persisted token record into memory.
    ///
    /// Should be called on startup.
    ///
    /// # Returns
    /// `true` if a record was loaded, `false` if none is stored.
    ///
    /// # Errors
    /// Returns error if the store itself fails (not if it is empty).
    pub async fn initialize(&self) -> Result<bool, AuthError> {
        match self.store.get().await.map_err(AuthError::Store)? {
            Some(record) => {
                *self.current.write().await = Some(record);
                info!("token manager initialized with stored tokens");
                Ok(true)
            }
            None => {
                debug!("no stored token record found");
                Ok(false)
            }
        }
    }

    /// Persist and cache a new token record (after a completed login).
    ///
    /// # Errors
    /// Returns error if the store write fails.
    pub async fn store_record(&self, record: TokenRecord) -> Result<(), AuthError> {
        self.store.set(&record).await.map_err(AuthError::Store)?;
        *self.current.write().await = Some(record);
        Ok(())
    }

    /// Whether a token pair is currently held.
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Current record without refreshing.
    pub async fn current_record(&self) -> Option<TokenRecord> {
        self.current.read().await.clone()
    }

    /// Get a usable access token, refreshing through the shared in-flight
    /// operation if the cached one is expired.
    ///
    /// # Errors
    /// Returns [`AuthError::NotAuthenticated`] when no pair is held and the
    /// refresh outcome otherwise.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        {
            let current = self.current.read().await;
            match current.as_ref() {
                Some(record) if !record.is_expired() => {
                    return Ok(record.access_token.clone());
                }
                Some(_) => {}
                None => return Err(AuthError::NotAuthenticated),
            }
        }

        let record = self.refresh_shared(false).await?;
        Ok(record.access_token)
    }

    /// Refresh unconditionally, even if the cached token still looks valid.
    ///
    /// Used after an HTTP 401: the server may have revoked a token that is
    /// not yet past its local expiry.
    ///
    /// # Errors
    /// Propagates the shared refresh outcome.
    pub async fn force_refresh(&self) -> Result<TokenRecord, AuthError> {
        self.refresh_shared(true).await
    }

    /// Clear the token pair everywhere (logout).
    ///
    /// # Errors
    /// Returns error if the store deletion fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.store.remove().await.map_err(AuthError::Store)?;
        *self.current.write().await = None;
        info!("token pair cleared");
        Ok(())
    }

    /// Join the in-flight refresh or start one.
    async fn refresh_shared(&self, force: bool) -> Result<TokenRecord, AuthError> {
        let fut = {
            let mut slot = self.inflight.lock().await;

            if let Some(existing) = slot.clone() {
                debug!("joining in-flight token refresh");
                existing
            } else {
                if !force {
                    // A refresh may have settled while we waited on the slot
                    let current = self.current.read().await;
                    match current.as_ref() {
                        Some(record) if !record.is_expired() => return Ok(record.clone()),
                        Some(_) => {}
                        None => return Err(AuthError::NotAuthenticated),
                    }
                }

                let this = self.clone();
                let fut: SharedRefresh =
                    async move { this.perform_refresh().await }.boxed().shared();
                *slot = Some(fut.clone());
                fut
            }
        };

        let result = fut.clone().await;

        // Clear the slot once this operation has settled; a ptr check keeps
        // a later refresh cycle's slot intact.
        let mut slot = self.inflight.lock().await;
        if slot.as_ref().is_some_and(|held| held.ptr_eq(&fut)) {
            *slot = None;
        }

        result
    }

    /// The actual network refresh; runs at most once per shared operation.
    async fn perform_refresh(&self) -> Result<TokenRecord, AuthError> {
        let refresh_token = {
            let current = self.current.read().await;
            let record = current.as_ref().ok_or(AuthError::NotAuthenticated)?;

            if !record.can_refresh() {
                // The refresh token itself is past its window; a network
                // call is doomed, so require a fresh login instead.
                return Err(AuthError::NotAuthenticated);
            }

            record.refresh_token.clone()
        };

        let response = self.endpoint.refresh(&refresh_token).await?;
        let record = TokenRecord::from_response(response, now_ms());

        self.store.set(&record).await.map_err(AuthError::Store)?;
        *self.current.write().await = Some(record.clone());

        info!("access token refreshed");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::manager.
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::store::MemoryTokenStore;
    use crate::auth::types::TokenResponse;

    /// Endpoint mock that counts refresh calls and can fail or dawdle.
    struct CountingEndpoint {
        refresh_calls: AtomicU32,
        delay: Duration,
        fail: bool,
    }

    impl CountingEndpoint {
        fn new(delay: Duration) -> Self {
            Self { refresh_calls: AtomicU32::new(0), delay, fail: false }
        }

        fn failing() -> Self {
            Self { refresh_calls: AtomicU32::new(0), delay: Duration::from_millis(10), fail: true }
        }

        fn calls(&self) -> u32 {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenEndpoint for CountingEndpoint {
        async fn exchange_code(
            &self,
            _code: &str,
            _verifier: &str,
        ) -> Result<TokenResponse, AuthError> {
            unreachable!("manager tests never exchange codes")
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, AuthError> {
            let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;

            if self.fail {
                return Err(AuthError::RefreshFailed("simulated rejection".to_string()));
            }

            Ok(TokenResponse {
                access_token: format!("at-{n}"),
                refresh_token: format!("rt-{n}"),
                expires_in: 7200,
                refresh_expires_in: 2_592_000,
            })
        }
    }

    fn expired_record() -> TokenRecord {
        TokenRecord {
            access_token: "stale".to_string(),
            refresh_token: "rt-0".to_string(),
            expires_at_ms: now_ms() - 1,
            refresh_expires_at_ms: now_ms() + 86_400_000,
        }
    }

    fn fresh_record() -> TokenRecord {
        TokenRecord {
            access_token: "fresh".to_string(),
            refresh_token: "rt-0".to_string(),
            expires_at_ms: now_ms() + 3_600_000,
            refresh_expires_at_ms: now_ms() + 86_400_000,
        }
    }

    async fn manager_with(
        endpoint: CountingEndpoint,
        record: Option<TokenRecord>,
    ) -> TokenManager<CountingEndpoint, MemoryTokenStore> {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = TokenManager::new(endpoint, store);
        if let Some(record) = record {
            manager.store_record(record).await.unwrap();
        }
        manager
    }

    /// Validates `TokenManager::access_token` behavior for the fast-path
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a valid cached token is returned with zero refresh calls.
    #[tokio::test]
    async fn test_valid_token_skips_refresh() {
        let manager =
            manager_with(CountingEndpoint::new(Duration::from_millis(10)), Some(fresh_record()))
                .await;

        assert_eq!(manager.access_token().await.unwrap(), "fresh");
        assert_eq!(manager.endpoint.calls(), 0);
    }

    /// Validates the single-flight refresh: concurrent callers during an
    /// in-flight refresh trigger exactly one network refresh call.
    ///
    /// Assertions:
    /// - Ensures all five concurrent callers resolve to the same new token.
    /// - Confirms the endpoint saw exactly one refresh invocation.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_refresh() {
        let manager =
            manager_with(CountingEndpoint::new(Duration::from_millis(50)), Some(expired_record()))
                .await;

        let (a, b, c, d, e) = tokio::join!(
            manager.access_token(),
            manager.access_token(),
            manager.access_token(),
            manager.access_token(),
            manager.access_token(),
        );

        for token in [a, b, c, d, e] {
            assert_eq!(token.unwrap(), "at-1");
        }
        assert_eq!(manager.endpoint.calls(), 1);
    }

    /// Validates that the shared refresh propagates one failure outcome to
    /// every waiting caller.
    ///
    /// Assertions:
    /// - Ensures both concurrent callers observe `RefreshFailed`.
    /// - Confirms exactly one network attempt was made.
    #[tokio::test(start_paused = true)]
    async fn test_failure_propagates_to_all_waiters() {
        let manager = manager_with(CountingEndpoint::failing(), Some(expired_record())).await;

        let (a, b) = tokio::join!(manager.access_token(), manager.access_token());

        assert!(matches!(a, Err(AuthError::RefreshFailed(_))));
        assert!(matches!(b, Err(AuthError::RefreshFailed(_))));
        assert_eq!(manager.endpoint.calls(), 1);
    }

    /// Validates that the in-flight slot clears after settling so a later
    /// cycle performs a new refresh.
    ///
    /// Assertions:
    /// - Confirms a second expired cycle issues a second network call.
    #[tokio::test(start_paused = true)]
    async fn test_slot_clears_after_settle() {
        let manager =
            manager_with(CountingEndpoint::new(Duration::from_millis(10)), Some(expired_record()))
                .await;

        assert_eq!(manager.access_token().await.unwrap(), "at-1");
        assert_eq!(manager.endpoint.calls(), 1);

        // Force a second refresh; the first operation must not be replayed.
        let record = manager.force_refresh().await.unwrap();
        assert_eq!(record.access_token, "at-2");
        assert_eq!(manager.endpoint.calls(), 2);
    }

    /// Validates `TokenManager::force_refresh` behavior for the
    /// valid-but-revoked token scenario.
    ///
    /// Assertions:
    /// - Ensures a refresh happens although the cached token looks valid.
    #[tokio::test]
    async fn test_force_refresh_ignores_local_expiry() {
        let manager =
            manager_with(CountingEndpoint::new(Duration::from_millis(1)), Some(fresh_record()))
                .await;

        let record = manager.force_refresh().await.unwrap();
        assert_eq!(record.access_token, "at-1");
        assert_eq!(manager.endpoint.calls(), 1);
    }

    /// Validates `TokenManager::access_token` behavior for the
    /// unauthenticated scenario.
    ///
    /// Assertions:
    /// - Ensures `NotAuthenticated` is returned with no network call.
    #[tokio::test]
    async fn test_not_authenticated() {
        let manager = manager_with(CountingEndpoint::new(Duration::from_millis(1)), None).await;

        assert!(matches!(manager.access_token().await, Err(AuthError::NotAuthenticated)));
        assert_eq!(manager.endpoint.calls(), 0);
    }

    /// Validates `TokenManager::perform_refresh` behavior for the expired
    /// refresh token scenario.
    ///
    /// Assertions:
    /// - Ensures the doomed refresh is rejected locally without a network
    ///   call.
    #[tokio::test]
    async fn test_expired_refresh_token_requires_login() {
        let record = TokenRecord {
            access_token: "stale".to_string(),
            refresh_token: "rt-0".to_string(),
            expires_at_ms: now_ms() - 1,
            refresh_expires_at_ms: now_ms() - 1,
        };
        let manager =
            manager_with(CountingEndpoint::new(Duration::from_millis(1)), Some(record)).await;

        assert!(matches!(manager.access_token().await, Err(AuthError::NotAuthenticated)));
        assert_eq!(manager.endpoint.calls(), 0);
    }

    /// Validates `TokenManager::logout` behavior for the clear-everywhere
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the manager and store both forget the pair.
    #[tokio::test]
    async fn test_logout_clears_pair() {
        let manager =
            manager_with(CountingEndpoint::new(Duration::from_millis(1)), Some(fresh_record()))
                .await;

        manager.logout().await.unwrap();
        assert!(!manager.is_authenticated().await);
        assert!(manager.store.get().await.unwrap().is_none());
    }

    /// Validates `TokenManager::initialize` behavior for the stored-record
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `initialize` reports whether a record was loaded.
    #[tokio::test]
    async fn test_initialize_loads_stored_record() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(&fresh_record()).await.unwrap();

        let manager =
            TokenManager::new(CountingEndpoint::new(Duration::from_millis(1)), store);
        assert!(manager.initialize().await.unwrap());
        assert!(manager.is_authenticated().await);

        let empty = TokenManager::new(
            CountingEndpoint::new(Duration::from_millis(1)),
            Arc::new(MemoryTokenStore::new()),
        );
        assert!(!empty.initialize().await.unwrap());
    }
}
