//! Chat flow: sending prompts and folding the streamed run into the store.
//!
//! Every run is tied to one fenced request. Events of a request that is no
//! longer current are dropped without touching the store, so a preempted
//! or stopped run can never overwrite a newer one.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::adapters::ReqwestHttpClient;
use crate::client::ChatClient;
use crate::error::{ApiClientError, ApiResult};
use crate::models::{
    is_local_conversation, now_millis, Conversation, ImageAttachment, Message, MessageStatus,
    ReasoningStatus, RunAgentInput, ToolCallStatus,
};
use crate::protocol::ProtocolEvent;
use crate::store::ChatStore;
use crate::traits::{HttpClient, StreamHandler};

/// Content given to a stopped run that produced no text.
pub const STOPPED_CONTENT: &str = "Generation stopped";

/// Content given to a failed run that produced no text.
pub const FAILED_CONTENT: &str =
    "Sorry, something went wrong while sending the message. Please try again later.";

/// Options of one prompt.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub model: Option<String>,
    pub thinking: Option<bool>,
    pub attachments: Vec<ImageAttachment>,
}

impl SendOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = Some(thinking);
        self
    }

    pub fn with_attachment(mut self, attachment: ImageAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// How a [`ChatSession::send_message`] call ended.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The stream signalled completion with `RUN_FINISHED` or `[DONE]`
    Completed,
    /// The stream completed, but the agent ended the run with `RUN_ERROR`
    RunFailed {
        message: String,
        code: Option<String>,
    },
    /// The run was stopped or preempted by a newer one
    Stopped,
    Failed(ApiClientError),
}

impl SendOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed)
    }
}

/// A chat client bound to a conversation store.
#[derive(Debug)]
pub struct ChatSession<C = ReqwestHttpClient> {
    client: ChatClient<C>,
    store: Arc<ChatStore>,
    /// Receives every event applied to the store
    events: Option<mpsc::UnboundedSender<ProtocolEvent>>,
}

impl<C: HttpClient> ChatSession<C> {
    pub fn new(client: ChatClient<C>, store: Arc<ChatStore>) -> Self {
        Self {
            client,
            store,
            events: None,
        }
    }

    /// Mirror applied events into a channel. Events of superseded requests
    /// are never sent.
    pub fn with_event_sink(mut self, events: mpsc::UnboundedSender<ProtocolEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn client(&self) -> &ChatClient<C> {
        &self.client
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    /// New local conversation, made active.
    pub fn create_conversation(&self) -> String {
        self.store.create_conversation(now_millis())
    }

    /// Stop the in-flight run, if any.
    pub fn stop(&self) -> bool {
        self.store.abort_streaming_request()
    }

    /// Send `text` to `conversation_id` and stream the reply into the store.
    ///
    /// Starting a send preempts any run still in flight.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        options: SendOptions,
    ) -> SendOutcome {
        let now = now_millis();
        let prompt = text.trim();
        let display = display_content(prompt, options.attachments.len());

        let user_id = Uuid::new_v4().to_string();
        let user_message =
            Message::user(&user_id, conversation_id, display.clone()).with_model(options.model.clone());
        self.store.push_message(conversation_id, user_message.clone());
        self.store
            .touch_conversation(conversation_id, &user_message, now);
        self.store
            .update_message(conversation_id, &user_id, |m| m.status = MessageStatus::Sent);

        let placeholder_id = Uuid::new_v4().to_string();
        self.store.push_message(
            conversation_id,
            Message::assistant_placeholder(&placeholder_id, conversation_id)
                .with_model(options.model.clone()),
        );

        let handle = self.store.begin_streaming_request();
        let request_id = handle.request_id();
        let local = is_local_conversation(conversation_id);

        let thread_id = (!local).then(|| conversation_id.to_string());
        let input = RunAgentInput::user_prompt(thread_id, &user_id, prompt, &options.attachments)
            .with_model(options.model)
            .with_thinking(options.thinking);

        debug!(request_id, conversation_id, run_id = %input.run_id, "Sending message");

        let mut run = RunReducer {
            store: &self.store,
            events: self.events.as_ref(),
            request_id,
            conversation_id: conversation_id.to_string(),
            assistant_id: placeholder_id.clone(),
            placeholder_id,
            prompt: display,
            local,
            closed: false,
            run_error: None,
        };

        let result = self
            .client
            .stream_chat(&input, &mut run, Some(handle.token()))
            .await;

        match result {
            Ok(()) => match run.run_error.take() {
                Some((message, code)) => SendOutcome::RunFailed { message, code },
                None => SendOutcome::Completed,
            },
            Err(e) => {
                run.fail(&e);
                self.store.complete_streaming_request(request_id);
                if e.is_abort() {
                    SendOutcome::Stopped
                } else {
                    SendOutcome::Failed(e)
                }
            }
        }
    }

    /// Refresh the conversation list from the server.
    ///
    /// On failure the current list is left as it is.
    pub async fn load_sessions(&self) -> ApiResult<()> {
        let response = self.client.fetch_sessions().await.map_err(|e| {
            error!(kind = %e.kind(), "Failed to load sessions: {}", e);
            e
        })?;
        let remote = response
            .sessions
            .iter()
            .map(Conversation::from_session)
            .collect();
        self.store.merge_conversations(remote);
        Ok(())
    }

    /// Fetch the transcript of a server conversation unless it is local or
    /// already loaded.
    ///
    /// A failed fetch leaves an empty transcript behind.
    pub async fn load_session_messages(&self, conversation_id: &str) -> ApiResult<()> {
        if is_local_conversation(conversation_id) || !self.store.messages(conversation_id).is_empty()
        {
            return Ok(());
        }

        let session_id = self
            .store
            .conversation(conversation_id)
            .and_then(|c| c.session_id)
            .unwrap_or_else(|| conversation_id.to_string());

        match self.client.fetch_session_messages(&session_id).await {
            Ok(response) => {
                let now = now_millis();
                let messages = response
                    .messages
                    .iter()
                    .enumerate()
                    .map(|(i, m)| Message::from_session_message(m, conversation_id, i, now))
                    .collect();
                self.store.set_messages(conversation_id, messages);
                Ok(())
            }
            Err(e) => {
                error!(session_id = %session_id, "Failed to load messages: {}", e);
                self.store.set_messages(conversation_id, Vec::new());
                Err(e)
            }
        }
    }

    /// Make `conversation_id` active, loading its transcript on first use.
    pub async fn select_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.store
            .set_active_conversation(Some(conversation_id.to_string()));
        if !is_local_conversation(conversation_id) && !self.store.has_transcript(conversation_id) {
            return self.load_session_messages(conversation_id).await;
        }
        Ok(())
    }
}

fn display_content(prompt: &str, attachments: usize) -> String {
    match (prompt.is_empty(), attachments) {
        (false, _) => prompt.to_string(),
        (true, 0) => String::new(),
        (true, 1) => "[1 image attached]".to_string(),
        (true, n) => format!("[{} images attached]", n),
    }
}

/// Applies one run's events to its assistant placeholder.
struct RunReducer<'a> {
    store: &'a ChatStore,
    events: Option<&'a mpsc::UnboundedSender<ProtocolEvent>>,
    request_id: u64,
    /// Changes when the server assigns a thread to a local conversation
    conversation_id: String,
    /// Changes when the server announces its own message id
    assistant_id: String,
    placeholder_id: String,
    prompt: String,
    local: bool,
    closed: bool,
    /// Message and code of a `RUN_ERROR`, if the run ended with one
    run_error: Option<(String, Option<String>)>,
}

impl RunReducer<'_> {
    fn is_current(&self) -> bool {
        self.store.is_current_request(self.request_id)
    }

    fn update<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let mut update = Some(update);
        for id in [&self.assistant_id, &self.placeholder_id] {
            let found = self.store.update_message(&self.conversation_id, id, |m| {
                if let Some(f) = update.take() {
                    f(m)
                }
            });
            if found {
                return true;
            }
        }
        false
    }

    fn finalize(&self) {
        self.store.finalize_conversation(
            &self.conversation_id,
            &self.assistant_id,
            &self.prompt,
            now_millis(),
        );
    }

    fn close(&mut self) {
        self.closed = true;
        self.store.complete_streaming_request(self.request_id);
    }

    /// Close out the placeholder of a failed run.
    fn fail(&mut self, error: &ApiClientError) {
        let aborted = error.is_abort();
        self.update(|m| {
            if aborted {
                m.status = MessageStatus::Sent;
                if m.content.is_empty() {
                    m.content = STOPPED_CONTENT.to_string();
                }
            } else {
                m.status = MessageStatus::Error;
                if m.content.is_empty() {
                    m.content = FAILED_CONTENT.to_string();
                }
            }
            m.close_reasoning();
        });
        self.closed = true;
    }

    fn apply(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::RunStarted { thread_id, .. } => {
                if self.local && !thread_id.is_empty() {
                    self.conversation_id = self.store.rekey_conversation(
                        &self.conversation_id,
                        &thread_id,
                        Some(&thread_id),
                    );
                    self.local = false;
                }
            }
            ProtocolEvent::TextMessageStart { message_id, .. } => {
                if message_id != self.assistant_id {
                    let adopted = self.update(|m| m.id = message_id.clone());
                    if adopted {
                        self.assistant_id = message_id;
                    }
                }
            }
            ProtocolEvent::TextMessageReasoningStart { .. } => {
                self.update(|m| m.reasoning_status = Some(ReasoningStatus::Thinking));
            }
            ProtocolEvent::TextMessageReasoningDelta { delta, .. } => {
                self.update(|m| {
                    m.reasoning.push_str(&delta);
                    m.reasoning_status = Some(ReasoningStatus::Thinking);
                });
            }
            ProtocolEvent::TextMessageReasoningEnd { .. } => {
                self.update(Message::close_reasoning);
            }
            ProtocolEvent::TextMessageDelta { delta, .. } => {
                self.update(|m| {
                    m.content.push_str(&delta);
                    m.close_reasoning();
                });
            }
            ProtocolEvent::TextMessageEnd { .. } => {}
            ProtocolEvent::ToolCallStart {
                tool_call_id,
                tool_call_name,
                ..
            } => {
                self.update(|m| {
                    m.tool_call_mut(&tool_call_id, tool_call_name.as_deref()).status =
                        ToolCallStatus::Running;
                });
            }
            ProtocolEvent::ToolCallArgs {
                tool_call_id, args, ..
            } => {
                self.update(|m| m.tool_call_mut(&tool_call_id, None).args = Some(args));
            }
            ProtocolEvent::ToolCallEnd {
                tool_call_id,
                tool_call_name,
                ..
            } => {
                self.update(|m| {
                    m.tool_call_mut(&tool_call_id, tool_call_name.as_deref()).status =
                        ToolCallStatus::Done;
                });
            }
            ProtocolEvent::RunFinished { .. } => {
                self.update(|m| {
                    m.status = MessageStatus::Sent;
                    m.close_reasoning();
                });
                self.finalize();
                self.close();
            }
            ProtocolEvent::RunError { message, code } => {
                warn!(request_id = self.request_id, code = ?code, "Run failed: {}", message);
                self.update(|m| {
                    m.status = MessageStatus::Error;
                    if m.content.is_empty() {
                        m.content = format!(
                            "Sorry, an error occurred while sending the message: {}",
                            message
                        );
                    }
                });
                self.run_error = Some((message, code));
                self.close();
            }
        }
    }
}

impl StreamHandler for RunReducer<'_> {
    fn on_event(&mut self, event: ProtocolEvent) {
        if !self.is_current() {
            debug!(
                request_id = self.request_id,
                event = event.event_type(),
                "Dropping event of a superseded request"
            );
            return;
        }
        if let Some(events) = self.events {
            let _ = events.send(event.clone());
        }
        self.apply(event);
    }

    fn on_done(&mut self) {
        if self.closed || !self.is_current() {
            return;
        }
        self.update(|m| {
            if m.status == MessageStatus::Streaming {
                m.status = MessageStatus::Sent;
            }
            m.close_reasoning();
        });
        self.finalize();
        self.close();
    }
}
