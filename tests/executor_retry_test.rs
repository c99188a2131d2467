//! End-to-end retry behavior of authenticated calls (wiremock).

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use matroid::adapters::ReqwestTransport;
use matroid::executor::ApiResult;
use matroid::{ClientConfig, Credentials, ErrorKind, MatroidClient};

mod common;

fn client_for(server: &MockServer) -> MatroidClient {
    common::init_tracing();
    let config = ClientConfig::new(Credentials::new("test-id", "test-secret"))
        .with_base_url(format!("{}/api/v1", server.uri()));
    MatroidClient::with_transport(config, Arc::new(ReqwestTransport::new()))
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-abc",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

async fn count_requests(server: &MockServer, want_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == want_path)
        .count()
}

#[tokio::test]
async fn test_call_succeeds_with_fresh_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"credits": 42})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.account_info().await.unwrap();

    assert_eq!(result, ApiResult::Json(json!({"credits": 42})));
    assert_eq!(count_requests(&server, "/api/v1/account").await, 1);
    assert_eq!(count_requests(&server, "/api/v1/oauth/token").await, 1);
}

#[tokio::test]
async fn test_expired_token_refreshed_and_call_retried_once() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    // First attempt is rejected with the vendor expiry code, second succeeds.
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"code": "token_expiration_err", "message": "expired"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"credits": 7})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.account_info().await.unwrap();

    assert_eq!(result, ApiResult::Json(json!({"credits": 7})));
    assert_eq!(count_requests(&server, "/api/v1/account").await, 2);

    // The retry goes through a forced server-side refresh.
    let token_bodies: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/v1/oauth/token")
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect();
    assert_eq!(token_bodies.len(), 2);
    assert!(!token_bodies[0].contains("refresh=true"));
    assert!(token_bodies[1].contains("refresh=true"));
}

#[tokio::test]
async fn test_second_expiry_surfaces_after_two_attempts() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"code": "token_expiration_err"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.account_info().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::TokenExpired);
    // One retry and no more.
    assert_eq!(count_requests(&server, "/api/v1/account").await, 2);
}

#[tokio::test]
async fn test_rate_limit_not_retried() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"code": "rate_err"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.account_info().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert!(err.is_retryable());
    assert_eq!(count_requests(&server, "/api/v1/account").await, 1);
}

#[tokio::test]
async fn test_server_error_classified() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"code": "server_err"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.account_info().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.status, Some(500));
}

#[tokio::test]
async fn test_post_sends_form_body() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/streams"))
        .and(body_string_contains("name=front+door"))
        .and(body_string_contains("url=rtsp%3A%2F%2Fcam.local%2Ffeed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"streamId": "s1"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .create_stream("rtsp://cam.local/feed", "front door")
        .await
        .unwrap();

    assert_eq!(result, ApiResult::Json(json!({"streamId": "s1"})));
}
