//! Request policies over the reqwest transport.

mod common;

use chatwire::adapters::ReqwestHttpClient;
use chatwire::client::{fetch_json, fetch_with_policy};
use chatwire::error::{ApiErrorKind, ErrorCode};
use chatwire::policy::{BoxError, RequestPolicy};
use chatwire::traits::HttpRequest;
use common::{client_for, config_for};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let http = ReqwestHttpClient::new();
    let policy = RequestPolicy::default()
        .with_retry_count(2)
        .with_retry_delay_ms(10);
    let value: Value = fetch_json(
        &http,
        &HttpRequest::get(format!("{}/flaky", server.uri())),
        &policy,
        None,
    )
    .await
    .unwrap();

    assert_eq!(value, json!({"ok": true}));
}

#[tokio::test]
async fn test_business_envelope_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eino/devops/ping"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 7, "msg": "maintenance"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.default_policy = config
        .default_policy
        .with_retry_count(2)
        .with_retry_delay_ms(10);
    let client = chatwire::client::ChatClient::new(config);

    let err = client.ping().await.unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Business);
    assert_eq!(err.status(), None);
    assert_eq!(err.code(), Some(&ErrorCode::Number(7)));
    assert_eq!(err.message(), "maintenance");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .expect(1)
        .mount(&server)
        .await;

    let http = ReqwestHttpClient::new();
    let policy = RequestPolicy::default().with_retry_count(3);
    let err = fetch_with_policy(
        &http,
        &HttpRequest::get(format!("{}/missing", server.uri())),
        &policy,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Http);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.payload(), Some(&Value::String("no such thing".to_string())));
}

#[tokio::test]
async fn test_attempt_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let http = ReqwestHttpClient::new();
    let policy = RequestPolicy::default().with_timeout_ms(100);
    let err = fetch_with_policy(
        &http,
        &HttpRequest::get(format!("{}/slow", server.uri())),
        &policy,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Timeout);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let http = ReqwestHttpClient::new();
    let policy = RequestPolicy::default().with_timeout_ms(0).with_retry_count(3);
    let err = fetch_with_policy(
        &http,
        &HttpRequest::get(format!("{}/slow", server.uri())),
        &policy,
        Some(&token),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ApiErrorKind::Abort);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_concurrent_401s_run_handler_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .mount(&server)
        .await;

    let client = chatwire::client::ChatClient::new(config_for(&server).with_auth_enabled(true));
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    client.unauthorized_gate().set_handler(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<(), BoxError>(())
        }
    });

    let (first, second) = tokio::join!(client.fetch_sessions(), client.fetch_sessions());

    for result in [first, second] {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(err.message(), "expired");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_401_without_auth_skips_handler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sessions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    client.unauthorized_gate().set_handler(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        }
    });

    let err = client.fetch_sessions().await.unwrap_err();
    assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
