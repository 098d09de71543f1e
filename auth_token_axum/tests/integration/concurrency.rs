//! Many requests in flight at once

use http::header::COOKIE;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::common::{Scenario, client};

#[tokio::test]
async fn test_concurrent_requests_get_their_own_verdicts() {
    let scenario = Scenario::start().await;
    for i in 0..10 {
        scenario
            .store
            .insert(&format!("token-{i}"), &format!("user-{i}"))
            .await;
    }

    let client = client();
    let mut tasks = JoinSet::new();
    for i in 0..60 {
        let client = client.clone();
        let url = scenario.url(&format!("/item/{i}"));
        tasks.spawn(async move {
            // Every third request is anonymous, the rest use one of ten sessions
            let request = client.get(url);
            let request = if i % 3 == 0 {
                request.header(COOKIE, format!("auth-token=bogus-{i}"))
            } else {
                request.header(COOKIE, format!("auth-token=token-{}", i % 10))
            };
            let response = request.send().await.unwrap();
            let status = response.status();
            let body = response.bytes().await.unwrap();
            (i, status, body)
        });
    }

    let mut admitted = 0;
    while let Some(result) = tasks.join_next().await {
        let (i, status, body) = result.unwrap();
        if i % 3 == 0 {
            assert!(status.is_redirection(), "request {i} got {status}");
        } else {
            assert!(status.is_success(), "request {i} got {status}");
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["user"], format!("user-{}", i % 10));
            assert_eq!(body["path"], format!("/item/{i}"));
            admitted += 1;
        }
    }

    assert_eq!(admitted, 40);
    assert_eq!(scenario.backend.hits(), 40);

    scenario.teardown().await;
}
