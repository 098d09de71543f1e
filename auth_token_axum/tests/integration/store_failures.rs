//! Behavior while the session store is down or stalled

use std::sync::Arc;

use http::StatusCode;
use http::header::{COOKIE, LOCATION};

use auth_token_axum::{GatewayConfig, StoreFailurePolicy};

use crate::common::{FailingStore, MockBackend, StalledStore, TestGateway, client, config_for};

#[tokio::test]
async fn test_failing_store_redirects_by_default() {
    let backend = MockBackend::start().await;
    let gateway = TestGateway::start(Arc::new(FailingStore), config_for(&backend)).await;

    let response = client()
        .get(gateway.url("/"))
        .header(COOKIE, "auth-token=testcookie")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    assert_eq!(backend.hits(), 0);

    gateway.shutdown().await;
    backend.shutdown();
}

#[tokio::test]
async fn test_failing_store_with_error_policy() {
    let backend = MockBackend::start().await;
    let config = GatewayConfig {
        store_failure_policy: StoreFailurePolicy::Error,
        ..config_for(&backend)
    };
    let gateway = TestGateway::start(Arc::new(FailingStore), config).await;
    let client = client();

    let with_token = client
        .get(gateway.url("/"))
        .header(COOKIE, "auth-token=testcookie")
        .send()
        .await
        .unwrap();
    // No token means no lookup, so the store state is irrelevant
    let without_token = client.get(gateway.url("/")).send().await.unwrap();

    assert_eq!(with_token.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(without_token.status(), StatusCode::FOUND);
    assert_eq!(backend.hits(), 0);

    gateway.shutdown().await;
    backend.shutdown();
}

#[tokio::test]
async fn test_stalled_store_is_bounded_by_lookup_timeout() {
    let backend = MockBackend::start().await;
    let gateway = TestGateway::start(Arc::new(StalledStore), config_for(&backend)).await;

    let started = std::time::Instant::now();
    let response = client()
        .get(gateway.url("/"))
        .header(COOKIE, "auth-token=testcookie")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(backend.hits(), 0);

    gateway.shutdown().await;
    backend.shutdown();
}
