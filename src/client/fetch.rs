//! Policy-wrapped HTTP requests.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{classify, ApiClientError, ApiResult};
use crate::models::ApiResponse;
use crate::policy::{run_with_policy, RequestPolicy};
use crate::traits::{HttpClient, HttpRequest, StreamingResponse};

/// Send `request` under `policy`, turning non-2xx responses into errors.
///
/// The deadline covers the request up to the response head; the returned
/// body has not been read yet.
pub async fn fetch_with_policy<C>(
    http: &C,
    request: &HttpRequest,
    policy: &RequestPolicy,
    signal: Option<&CancellationToken>,
) -> ApiResult<StreamingResponse>
where
    C: HttpClient + ?Sized,
{
    run_with_policy(
        move |_token| async move { send_checked(http, request).await },
        policy,
        signal,
    )
    .await
}

/// Send `request` under `policy` and decode its JSON body.
///
/// Unlike [`fetch_with_policy`] the body read and decode are part of each
/// attempt, so they count against the deadline and are retried with it.
pub async fn fetch_json<T, C>(
    http: &C,
    request: &HttpRequest,
    policy: &RequestPolicy,
    signal: Option<&CancellationToken>,
) -> ApiResult<T>
where
    T: DeserializeOwned,
    C: HttpClient + ?Sized,
{
    run_with_policy(
        move |_token| async move {
            let response = send_checked(http, request).await?;
            let response = response.collect().await.map_err(classify)?;
            response.json::<T>().map_err(classify)
        },
        policy,
        signal,
    )
    .await
}

/// [`fetch_json`] for `{code, msg, data}` envelopes.
///
/// A non-zero `code` is checked after the policy has finished, so it fails
/// with a `business` error and is never retried.
pub async fn fetch_api<T, C>(
    http: &C,
    request: &HttpRequest,
    policy: &RequestPolicy,
    signal: Option<&CancellationToken>,
) -> ApiResult<ApiResponse<T>>
where
    T: DeserializeOwned,
    C: HttpClient + ?Sized,
{
    let response: ApiResponse<T> = fetch_json(http, request, policy, signal).await?;
    response.ensure_success()
}

async fn send_checked<C>(http: &C, request: &HttpRequest) -> ApiResult<StreamingResponse>
where
    C: HttpClient + ?Sized,
{
    let response = http.send(request).await.map_err(classify)?;
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status;
    let status_text = response.status_text.clone();
    let payload = parse_response_body(response).await;
    Err(ApiClientError::http_status(status, &status_text, payload))
}

/// Best-effort decode of an error response body.
///
/// JSON when the content type says so (None if it does not parse), text
/// otherwise, None for an empty or unreadable body.
pub async fn parse_response_body(response: StreamingResponse) -> Option<Value> {
    let is_json = response
        .header("content-type")
        .is_some_and(|ct| ct.contains("application/json"));

    let response = response.collect().await.ok()?;
    if is_json {
        return serde_json::from_slice::<Value>(&response.body)
            .ok()
            .filter(|v| !v.is_null());
    }

    let text = response.text();
    (!text.is_empty()).then_some(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockHttpClient, MockResponse};
    use crate::error::ApiErrorKind;
    use crate::traits::{Headers, HttpError};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const URL: &str = "http://api.test/items";

    fn no_retry() -> RequestPolicy {
        RequestPolicy::default().with_retry_count(0)
    }

    #[tokio::test]
    async fn test_success_returns_unread_body() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::chunks(["a", "b"]));

        let response = fetch_with_policy(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.collect().await.unwrap().text(), "ab");
    }

    #[tokio::test]
    async fn test_json_error_body_message() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::json(400, &json!({"msg": "bad input"})));

        let err = fetch_with_policy(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Http);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.message(), "bad input");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_text_error_body_is_payload() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::status(503, "maintenance"));

        let err = fetch_with_policy(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap_err();
        assert_eq!(err.payload(), Some(&json!("maintenance")));
        assert!(err.is_retryable());
        // No reason phrase from the mock, so the status fallback is used.
        assert_eq!(err.message(), "HTTP 503");
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_retried() {
        let http = MockHttpClient::new();
        http.push_response(URL, MockResponse::status(502, ""));
        http.push_response(URL, MockResponse::chunks(["ok"]));

        let policy = RequestPolicy::default().with_retry_count(1);
        let response = fetch_with_policy(&http, &HttpRequest::get(URL), &policy, None)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(http.request_count(URL), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_calls_hook_without_retry() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::status(401, ""));

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = RequestPolicy::default()
            .with_retry_count(3)
            .with_on_unauthorized(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });

        let err = fetch_with_policy(&http, &HttpRequest::get(URL), &policy, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(err.message(), "Unauthorized");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(http.request_count(URL), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_classified() {
        let http = MockHttpClient::new();
        http.set_response(
            URL,
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );

        let err = fetch_with_policy(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Network);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[tokio::test]
    async fn test_fetch_json_decodes_body() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::json(200, &json!({"id": 7})));

        let item: Item = fetch_json(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap();
        assert_eq!(item, Item { id: 7 });
    }

    #[tokio::test]
    async fn test_fetch_json_invalid_body_is_unknown() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::chunks(["<html>"]));

        let err = fetch_json::<Item, _>(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unknown);
        assert!(err.message().starts_with("Invalid JSON response"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_api_business_code_not_retried() {
        let http = MockHttpClient::new();
        http.set_response(
            URL,
            MockResponse::json(200, &json!({"code": 7, "msg": "graph locked", "data": null})),
        );

        let policy = RequestPolicy::default().with_retry_count(3);
        let err = fetch_api::<Item, _>(&http, &HttpRequest::get(URL), &policy, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Business);
        assert_eq!(err.message(), "graph locked");
        assert_eq!(err.error_code(), "E_API_BUSINESS");
        assert!(!err.is_retryable());
        assert_eq!(http.request_count(URL), 1);
    }

    #[tokio::test]
    async fn test_fetch_api_success_keeps_data() {
        let http = MockHttpClient::new();
        http.set_response(URL, MockResponse::json(200, &json!({"code": 0, "data": {"id": 3}})));

        let response = fetch_api::<Item, _>(&http, &HttpRequest::get(URL), &no_retry(), None)
            .await
            .unwrap();
        assert_eq!(response.data, Some(Item { id: 3 }));
    }

    #[tokio::test]
    async fn test_parse_response_body_variants() {
        let mut json_headers = Headers::new();
        json_headers.insert("Content-Type".to_string(), "application/json; charset=utf-8".to_string());

        let http = MockHttpClient::new();
        http.push_response(
            URL,
            MockResponse::Stream {
                status: 500,
                headers: json_headers.clone(),
                chunks: vec!["{not json".into()],
            },
        );
        http.push_response(
            URL,
            MockResponse::Stream {
                status: 500,
                headers: Headers::new(),
                chunks: vec![],
            },
        );

        let first = http.send(&HttpRequest::get(URL)).await.unwrap();
        assert_eq!(parse_response_body(first).await, None);
        let second = http.send(&HttpRequest::get(URL)).await.unwrap();
        assert_eq!(parse_response_body(second).await, None);
    }
}
