//! Integration tests for the token refresh path against a mock
//! authorization server.
//!
//! The unit suite covers the single-flight machinery with counting mocks;
//! these tests prove the same property over real HTTP: concurrent callers
//! during an in-flight refresh produce exactly one network refresh call.

use std::sync::Arc;
use std::time::Duration;

use larkdown_common::auth::{
    AuthClient, AuthConfig, AuthError, MemoryTokenStore, TokenManager, TokenRecord,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> AuthConfig {
    AuthConfig::new(
        "cli_test".to_string(),
        "http://localhost:8910/callback".to_string(),
        format!("{}/authorize", server.uri()),
        format!("{}/token", server.uri()),
        format!("{}/refresh", server.uri()),
    )
}

fn expired_record() -> TokenRecord {
    let now = larkdown_common::auth::types::now_ms();
    TokenRecord {
        access_token: "stale".to_string(),
        refresh_token: "rt-old".to_string(),
        expires_at_ms: now - 1,
        refresh_expires_at_ms: now + 86_400_000,
    }
}

async fn manager_for(server: &MockServer) -> TokenManager<AuthClient, MemoryTokenStore> {
    let client = AuthClient::new(config_for(server)).unwrap();
    let manager = TokenManager::new(client, Arc::new(MemoryTokenStore::new()));
    manager.store_record(expired_record()).await.unwrap();
    manager
}

/// Concurrent callers needing a fresh token share exactly one refresh
/// request over the wire; `expect(1)` fails the test on a second call.
#[tokio::test]
async fn test_concurrent_refresh_hits_network_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "rt-old",
            "app_id": "cli_test",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(50))
                .set_body_json(json!({
                    "code": 0,
                    "msg": "success",
                    "data": {
                        "access_token": "at-new",
                        "refresh_token": "rt-new",
                        "expires_in": 7200,
                        "refresh_expires_in": 2_592_000,
                    }
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_for(&server).await;

    let (a, b, c, d) = tokio::join!(
        manager.access_token(),
        manager.access_token(),
        manager.access_token(),
        manager.access_token(),
    );

    for token in [a, b, c, d] {
        assert_eq!(token.unwrap(), "at-new");
    }

    // The refreshed pair replaced the stale one in place.
    let record = manager.current_record().await.unwrap();
    assert_eq!(record.refresh_token, "rt-new");
}

/// A rejected refresh propagates the same failure to every waiter and
/// still only hits the network once.
#[tokio::test]
async fn test_rejected_refresh_propagates_to_all_waiters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(50))
                .set_body_json(json!({"code": 20037, "msg": "refresh token revoked"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_for(&server).await;

    let (a, b, c) = tokio::join!(
        manager.access_token(),
        manager.access_token(),
        manager.access_token(),
    );

    for outcome in [a, b, c] {
        match outcome {
            Err(AuthError::RefreshFailed(msg)) => assert!(msg.contains("20037")),
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
    }
}

/// After a settled refresh, a later expiry starts a genuinely new network
/// refresh (the in-flight slot was cleared).
#[tokio::test]
async fn test_sequential_refreshes_each_hit_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "success",
            "data": {
                "access_token": "at-new",
                "refresh_token": "rt-new",
                "expires_in": 7200,
                "refresh_expires_in": 2_592_000,
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let manager = manager_for(&server).await;

    assert_eq!(manager.access_token().await.unwrap(), "at-new");
    let second = manager.force_refresh().await.unwrap();
    assert_eq!(second.access_token, "at-new");
}
