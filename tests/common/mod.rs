//! Shared helpers for integration tests.

#![allow(dead_code)]

use chatwire::client::ChatClient;
use chatwire::config::ClientConfig;
use serde_json::Value;
use wiremock::MockServer;

/// SSE body of `data:` frames, one per event.
pub fn sse_body(events: &[Value]) -> String {
    events.iter().map(|e| format!("data: {}\n\n", e)).collect()
}

/// Config pointed at the mock server with fast retries.
pub fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default().with_api_origin(server.uri());
    config.session_policy = config.session_policy.with_retry_delay_ms(10);
    config
}

pub fn client_for(server: &MockServer) -> ChatClient {
    ChatClient::new(config_for(server))
}
