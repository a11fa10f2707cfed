//! Graph devtools endpoints under the devops prefix.
//!
//! Every JSON response is a `{code, msg, data}` envelope; a non-zero code
//! fails with a `business` error.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::chat::ChatClient;
use super::fetch::fetch_api;
use super::stream::stream_sse;
use crate::error::{classify, ApiResult};
use crate::models::{ApiResponse, DebugRunRequest, DebugThreadResponse, GraphListResponse};
use crate::protocol::{parse_sse_data_payload, SseData};
use crate::traits::{HttpClient, HttpRequest};

impl<C: HttpClient> ChatClient<C> {
    /// Liveness check of the devtools server.
    pub async fn ping(&self) -> ApiResult<ApiResponse<Value>> {
        let request = self.devops_get("/ping");
        let policy = self.policy(&self.config().default_policy);
        fetch_api(self.http(), &request, &policy, None).await
    }

    pub async fn fetch_graphs(&self) -> ApiResult<ApiResponse<GraphListResponse>> {
        let request = self.devops_get("/debug/v1/graphs");
        let policy = self.policy(&self.config().default_policy);
        fetch_api(self.http(), &request, &policy, None).await
    }

    /// Open a debug thread on `graph_id`; runs are streamed into it.
    pub async fn create_debug_thread(
        &self,
        graph_id: &str,
        input: &Value,
    ) -> ApiResult<ApiResponse<DebugThreadResponse>> {
        let url = self.config().devops_url(&format!(
            "/debug/v1/graphs/{}/threads",
            urlencoding::encode(graph_id)
        ));
        let body = serde_json::to_string(input).map_err(classify)?;
        let request = HttpRequest::post(url, body)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json");
        let policy = self.policy(&self.config().default_policy);
        fetch_api(self.http(), &request, &policy, None).await
    }

    /// Run a graph in debug mode and hand each node frame to `on_data`.
    ///
    /// Frames that do not match the [`SseData`] shape are dropped; only the
    /// first is logged.
    pub async fn stream_debug_run<F>(
        &self,
        graph_id: &str,
        thread_id: &str,
        run: &DebugRunRequest,
        mut on_data: F,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<()>
    where
        F: FnMut(SseData),
    {
        let url = self.config().devops_url(&format!(
            "/debug/v1/graphs/{}/threads/{}/stream",
            urlencoding::encode(graph_id),
            urlencoding::encode(thread_id)
        ));
        let body = serde_json::to_string(run).map_err(classify)?;
        let request = HttpRequest::post(url, body)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "text/event-stream");
        let policy = self.policy(&self.config().stream_policy);

        debug!(graph_id, thread_id, from_node = %run.from_node, "Starting debug run");
        let mut warned = false;
        stream_sse(self.http(), &request, &policy, cancel, |message| {
            match parse_sse_data_payload(&message.data) {
                Ok(data) => on_data(data),
                Err(invalid) if !warned => {
                    warned = true;
                    warn!(kind = %invalid.kind, "Ignoring invalid debug payload");
                }
                Err(_) => {}
            }
        })
        .await
    }

    fn devops_get(&self, path: &str) -> HttpRequest {
        HttpRequest::get(self.config().devops_url(path)).with_header("Accept", "application/json")
    }
}
