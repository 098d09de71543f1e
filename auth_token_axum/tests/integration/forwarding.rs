//! What the backend sees and what the client gets back

use std::time::Duration;

use http::StatusCode;
use http::header::{CONTENT_LENGTH, COOKIE, LOCATION, SET_COOKIE};
use serde_json::Value;

use auth_token_axum::GatewayConfig;

use crate::common::{FIXED_BODY, KNOWN_USER, LARGE_BODY_LEN, Scenario, client};

const AUTH: &str = "auth-token=testcookie";

async fn json(response: reqwest::Response) -> Value {
    serde_json::from_slice(&response.bytes().await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_path_query_and_cookies_are_preserved() {
    let scenario = Scenario::start().await;

    let response = client()
        .get(scenario.url("/reports/2024?page=2&sort=desc"))
        .header(COOKIE, "theme=dark; auth-token=testcookie")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["path"], "/reports/2024");
    assert_eq!(body["query"], "page=2&sort=desc");
    assert_eq!(body["cookie"], "theme=dark; auth-token=testcookie");

    scenario.teardown().await;
}

#[tokio::test]
async fn test_client_supplied_identity_is_replaced() {
    // Given a client trying to impersonate someone else
    let scenario = Scenario::start().await;

    // When it sends its own X-User-Id along with a valid token
    let response = client()
        .get(scenario.url("/"))
        .header(COOKIE, AUTH)
        .header("x-user-id", "admin")
        .header("x-user-id", "root")
        .send()
        .await
        .unwrap();

    // Then the backend sees exactly one identity header, the resolved one
    let body = json(response).await;
    assert_eq!(body["user"], KNOWN_USER);
    assert_eq!(body["user_headers"], 1);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_request_body_reaches_backend() {
    let scenario = Scenario::start().await;

    let response = client()
        .post(scenario.url("/submit"))
        .header(COOKIE, AUTH)
        .body("name=widget&count=3")
        .send()
        .await
        .unwrap();

    let body = json(response).await;
    assert_eq!(body["method"], "POST");
    assert_eq!(body["body"], "name=widget&count=3");

    scenario.teardown().await;
}

#[tokio::test]
async fn test_forwarded_headers_are_added() {
    let scenario = Scenario::start().await;

    let response = client()
        .get(scenario.url("/"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    let body = json(response).await;
    assert_eq!(body["forwarded_for"], "127.0.0.1");
    assert_eq!(body["forwarded_proto"], "http");

    scenario.teardown().await;
}

#[tokio::test]
async fn test_backend_errors_are_relayed() {
    let scenario = Scenario::start().await;
    let client = client();

    for code in [404u16, 500, 503] {
        let response = client
            .get(scenario.url(&format!("/status/{code}")))
            .header(COOKIE, AUTH)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), code);
        assert_eq!(response.text().await.unwrap(), format!("backend says {code}"));
    }

    scenario.teardown().await;
}

#[tokio::test]
async fn test_backend_redirect_is_relayed_not_followed() {
    let scenario = Scenario::start().await;

    let response = client()
        .get(scenario.url("/moved"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/elsewhere");
    assert_eq!(scenario.backend.hits(), 1);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_repeated_response_headers_survive() {
    let scenario = Scenario::start().await;

    let response = client()
        .get(scenario.url("/cookies"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    let cookies: Vec<_> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies, vec!["a=1; Path=/", "b=2; Path=/"]);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let scenario = Scenario::start_with(|config| GatewayConfig {
        backend_url: "http://127.0.0.1:1".to_string(),
        ..config
    })
    .await;

    let admitted = client()
        .get(scenario.url("/"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();
    let denied = client().get(scenario.url("/")).send().await.unwrap();

    assert_eq!(admitted.status(), StatusCode::BAD_GATEWAY);
    assert!(admitted.headers().get(LOCATION).is_none());
    // Denials never touch the backend
    assert_eq!(denied.status(), StatusCode::FOUND);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_slow_backend_hits_request_budget() {
    let scenario = Scenario::start_with(|config| GatewayConfig {
        request_timeout: Duration::from_millis(300),
        ..config
    })
    .await;

    let response = client()
        .get(scenario.url("/slow"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let scenario = Scenario::start_with(|config| GatewayConfig {
        max_body_bytes: 16,
        ..config
    })
    .await;

    let response = client()
        .post(scenario.url("/upload"))
        .header(COOKIE, AUTH)
        .body("x".repeat(64))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(scenario.backend.hits(), 0);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_response_user_header_when_configured() {
    let scenario = Scenario::start_with(|config| GatewayConfig {
        response_user_header: Some(http::HeaderName::from_static("x-authenticated-user")),
        ..config
    })
    .await;
    let client = client();

    let admitted = client
        .get(scenario.url("/"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();
    let denied = client.get(scenario.url("/")).send().await.unwrap();

    assert_eq!(
        admitted.headers().get("x-authenticated-user").unwrap(),
        KNOWN_USER
    );
    assert!(denied.headers().get("x-authenticated-user").is_none());

    scenario.teardown().await;
}

#[tokio::test]
async fn test_custom_user_header() {
    let scenario = Scenario::start_with(|config| GatewayConfig {
        user_header: http::HeaderName::from_static("x-remote-user"),
        ..config
    })
    .await;

    let response = client()
        .get(scenario.url("/"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    let body = json(response).await;
    assert_eq!(body["remote_user"], KNOWN_USER);
    assert!(body["user"].is_null());
    assert_eq!(body["user_headers"], 0);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_head_keeps_backend_content_length() {
    let scenario = Scenario::start().await;
    let client = client();

    // Given the length the backend itself announces for HEAD
    let direct = client
        .head(format!("{}/fixed", scenario.backend.base_url))
        .send()
        .await
        .unwrap();
    let expected = FIXED_BODY.len().to_string();
    assert_eq!(direct.headers().get(CONTENT_LENGTH).unwrap(), expected.as_str());

    // When the same HEAD goes through the gateway
    let proxied = client
        .head(scenario.url("/fixed"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    // Then the client sees the backend's length, not the empty relayed body
    assert_eq!(proxied.status(), StatusCode::OK);
    assert_eq!(proxied.headers().get(CONTENT_LENGTH).unwrap(), expected.as_str());

    scenario.teardown().await;
}

#[tokio::test]
async fn test_get_content_length_matches_relayed_body() {
    let scenario = Scenario::start().await;

    let response = client()
        .get(scenario.url("/fixed"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    let expected = FIXED_BODY.len().to_string();
    assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), expected.as_str());
    assert_eq!(response.text().await.unwrap(), FIXED_BODY);

    scenario.teardown().await;
}

#[tokio::test]
async fn test_oversized_backend_body_is_bad_gateway() {
    let scenario = Scenario::start_with(|config| GatewayConfig {
        max_body_bytes: LARGE_BODY_LEN / 2,
        ..config
    })
    .await;
    let client = client();

    let large = client
        .get(scenario.url("/large"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();
    // Bodies under the cap still pass
    let small = client
        .get(scenario.url("/fixed"))
        .header(COOKIE, AUTH)
        .send()
        .await
        .unwrap();

    assert_eq!(large.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(small.status(), StatusCode::OK);

    scenario.teardown().await;
}
