//! Chat backend client.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::fetch::fetch_json;
use super::stream::stream_sse;
use crate::adapters::ReqwestHttpClient;
use crate::config::ClientConfig;
use crate::error::{classify, ApiClientError, ApiResult};
use crate::models::{
    ChatMessageResponse, RunAgentInput, SessionListResponse, SessionMessagesResponse,
};
use crate::policy::{RequestPolicy, UnauthorizedGate};
use crate::protocol::{AdapterOptions, MessageRole, ProtocolAdapter, ProtocolEvent};
use crate::traits::{HttpClient, HttpRequest, StreamHandler};

/// Client for the chat run and session endpoints.
///
/// Generic over the transport so tests can inject
/// [`MockHttpClient`](crate::adapters::MockHttpClient).
#[derive(Debug)]
pub struct ChatClient<C = ReqwestHttpClient> {
    http: C,
    config: ClientConfig,
    unauthorized: Arc<UnauthorizedGate>,
}

impl ChatClient<ReqwestHttpClient> {
    /// Client over reqwest, identified by the configured user agent.
    pub fn new(config: ClientConfig) -> Self {
        let http = ReqwestHttpClient::with_user_agent(&config.user_agent);
        Self::with_http_client(http, config)
    }
}

impl<C: HttpClient> ChatClient<C> {
    pub fn with_http_client(http: C, config: ClientConfig) -> Self {
        Self {
            http,
            config,
            unauthorized: Arc::new(UnauthorizedGate::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    /// Gate notified on 401 responses when auth is enabled.
    pub fn unauthorized_gate(&self) -> &Arc<UnauthorizedGate> {
        &self.unauthorized
    }

    /// `base` with the unauthorized hook attached when auth is enabled.
    pub(super) fn policy(&self, base: &RequestPolicy) -> RequestPolicy {
        if !self.config.auth_enabled || base.on_unauthorized.is_some() {
            return base.clone();
        }
        base.clone().with_unauthorized_hook(self.unauthorized.hook())
    }

    pub fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/{}",
            self.config.sessions_url(),
            urlencoding::encode(session_id)
        )
    }

    /// Run the agent and feed every protocol event to `handler`.
    ///
    /// Succeeds only if the stream signalled completion. Any failure,
    /// cancellation included, is reported to `handler.on_error` before it
    /// is returned.
    pub async fn stream_chat<H>(
        &self,
        input: &RunAgentInput,
        handler: H,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<()>
    where
        H: StreamHandler,
    {
        let options = AdapterOptions {
            strict: self.config.strict_events,
        };
        let mut adapter = ProtocolAdapter::with_options(handler, options);

        let result = match self.chat_request(input) {
            Ok(request) => {
                let policy = self.policy(&self.config.stream_policy);
                debug!(run_id = %input.run_id, thread_id = ?input.thread_id, "Starting chat run");
                let streamed = stream_sse(&self.http, &request, &policy, cancel, |message| {
                    adapter.handle_message(&message)
                })
                .await;
                streamed.and_then(|()| adapter.ensure_completed())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if e.is_abort() {
                debug!(run_id = %input.run_id, "Chat run aborted");
            } else {
                error!(
                    run_id = %input.run_id,
                    kind = %e.kind(),
                    code = e.error_code(),
                    "Error streaming chat message: {}",
                    e
                );
            }
            adapter.handler_mut().on_error(e);
        }
        result
    }

    /// Run the agent to completion and fold the run into one reply.
    ///
    /// A `RUN_ERROR` event fails the call with a `business` error carrying
    /// the run's message.
    pub async fn send_chat_message(&self, input: &RunAgentInput) -> ApiResult<ChatMessageResponse> {
        let mut run = RunCollector::default();
        self.stream_chat(input, &mut run, None).await?;

        if let Some((message, code)) = run.run_error {
            let mut error = ApiClientError::business(0, Some(&message));
            if let Some(code) = code {
                error = error.with_code(code.as_str());
            }
            return Err(error);
        }

        Ok(ChatMessageResponse {
            role: MessageRole::Assistant,
            content: run.content,
            reasoning_content: (!run.reasoning.is_empty()).then_some(run.reasoning),
        })
    }

    pub async fn fetch_sessions(&self) -> ApiResult<SessionListResponse> {
        let request = HttpRequest::get(self.config.sessions_url())
            .with_header("Accept", "application/json");
        let policy = self.policy(&self.config.session_policy);
        fetch_json(&self.http, &request, &policy, None).await
    }

    pub async fn fetch_session_messages(&self, session_id: &str) -> ApiResult<SessionMessagesResponse> {
        let request =
            HttpRequest::get(self.session_url(session_id)).with_header("Accept", "application/json");
        let policy = self.policy(&self.config.session_policy);
        fetch_json(&self.http, &request, &policy, None).await
    }

    fn chat_request(&self, input: &RunAgentInput) -> ApiResult<HttpRequest> {
        let body = serde_json::to_string(input).map_err(classify)?;
        Ok(HttpRequest::post(self.config.chat_url(), body)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "text/event-stream"))
    }
}

/// Accumulates a run's text, reasoning and error.
#[derive(Debug, Default)]
struct RunCollector {
    content: String,
    reasoning: String,
    run_error: Option<(String, Option<String>)>,
}

impl StreamHandler for RunCollector {
    fn on_event(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::TextMessageDelta { delta, .. } => self.content.push_str(&delta),
            ProtocolEvent::TextMessageReasoningDelta { delta, .. } => {
                self.reasoning.push_str(&delta)
            }
            ProtocolEvent::RunError { message, code } => self.run_error = Some((message, code)),
            _ => {}
        }
    }
}
