use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::{Session, SessionMessage};
use crate::protocol::MessageRole;

/// Title given to conversations created locally.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Longest title derived from the first prompt, in characters.
pub const TITLE_MAX_CHARS: usize = 30;

/// Prefix of conversation ids the server has not assigned yet.
pub const LOCAL_CONVERSATION_PREFIX: &str = "local_";

/// Current wall clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Delivery state of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Streaming,
    Sent,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningStatus {
    Thinking,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Running,
    Done,
    Error,
}

/// Progress of one tool call made during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallState {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    pub status: ToolCallStatus,
}

impl ToolCallState {
    pub const DEFAULT_NAME: &'static str = "tool_call";
}

/// A message as shown in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_status: Option<ReasoningStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallState>,
}

impl Message {
    fn new(
        id: String,
        conversation_id: String,
        role: MessageRole,
        content: String,
        status: MessageStatus,
    ) -> Self {
        Self {
            id,
            conversation_id,
            role,
            content,
            timestamp: now_millis(),
            status,
            model: None,
            reasoning: String::new(),
            reasoning_status: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(
            id.into(),
            conversation_id.into(),
            MessageRole::User,
            content.into(),
            MessageStatus::Sending,
        )
    }

    /// Empty assistant message waiting for streamed content.
    pub fn assistant_placeholder(id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self::new(
            id.into(),
            conversation_id.into(),
            MessageRole::Assistant,
            String::new(),
            MessageStatus::Streaming,
        )
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Stored session message at position `index` of its conversation.
    ///
    /// Tool messages render as assistant messages. Timestamps are spread
    /// backwards from `now` so that the original order is kept.
    pub fn from_session_message(
        message: &SessionMessage,
        conversation_id: &str,
        index: usize,
        now: i64,
    ) -> Self {
        let role = match message.role {
            MessageRole::Tool => MessageRole::Assistant,
            role => role,
        };
        let reasoning = message.reasoning_content.clone().unwrap_or_default();
        let reasoning_status = (!reasoning.is_empty()).then_some(ReasoningStatus::Done);

        Self {
            id: format!("{}-{}", conversation_id, index),
            conversation_id: conversation_id.to_string(),
            role,
            content: message.content.clone(),
            timestamp: now - (1000 - index as i64),
            status: MessageStatus::Sent,
            model: message.model.clone(),
            reasoning,
            reasoning_status,
            tool_calls: Vec::new(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }

    /// Move an open reasoning phase to done.
    pub fn close_reasoning(&mut self) {
        if self.reasoning_status == Some(ReasoningStatus::Thinking) {
            self.reasoning_status = Some(ReasoningStatus::Done);
        }
    }

    /// The tool call with `id`, appended as running if new.
    ///
    /// A provided `name` replaces the current one.
    pub fn tool_call_mut(&mut self, id: &str, name: Option<&str>) -> &mut ToolCallState {
        let index = match self.tool_calls.iter().position(|tc| tc.id == id) {
            Some(index) => {
                if let Some(name) = name {
                    self.tool_calls[index].name = name.to_string();
                }
                index
            }
            None => {
                self.tool_calls.push(ToolCallState {
                    id: id.to_string(),
                    name: name.unwrap_or(ToolCallState::DEFAULT_NAME).to_string(),
                    args: None,
                    status: ToolCallStatus::Running,
                });
                self.tool_calls.len() - 1
            }
        };
        &mut self.tool_calls[index]
    }
}

/// A conversation in the sidebar list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Branch id the server expects for follow-up calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub title: String,
    /// Epoch milliseconds
    pub updated_at: i64,
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Box<Message>>,
}

impl Conversation {
    /// Conversation not yet known to the server.
    pub fn local(now: i64) -> Self {
        Self {
            id: format!("{}{}", LOCAL_CONVERSATION_PREFIX, now),
            session_id: None,
            title: NEW_CHAT_TITLE.to_string(),
            updated_at: now,
            unread_count: 0,
            last_message: None,
        }
    }

    pub fn from_session(session: &Session) -> Self {
        let updated_at = session.updated_at_millis().unwrap_or_default();
        let last_message = (!session.last_message.is_empty()).then(|| {
            let mut message = Message::new(
                format!("last-{}", session.id),
                session.id.clone(),
                MessageRole::Assistant,
                session.last_message.clone(),
                MessageStatus::Sent,
            );
            message.timestamp = updated_at;
            Box::new(message)
        });

        Self {
            id: session.id.clone(),
            session_id: Some(session.last_active_session_id.clone()).filter(|s| !s.is_empty()),
            title: session.title.clone(),
            updated_at,
            unread_count: 0,
            last_message,
        }
    }

    pub fn is_local(&self) -> bool {
        is_local_conversation(&self.id)
    }

    pub fn has_default_title(&self) -> bool {
        self.title == NEW_CHAT_TITLE
    }
}

pub fn is_local_conversation(id: &str) -> bool {
    id.starts_with(LOCAL_CONVERSATION_PREFIX)
}

/// Conversation title derived from the first prompt.
pub fn title_from_text(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
