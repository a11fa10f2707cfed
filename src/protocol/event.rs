//! The AG-UI protocol event alphabet.
//!
//! Events arrive as JSON objects discriminated by a `type` field with
//! SCREAMING_SNAKE_CASE values and camelCase fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Author role of a text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::System => "system",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A present optional field; `null` is a type error, not absence.
pub(super) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A validated protocol event.
///
/// Optional string fields may be omitted, but when present they must be
/// strings: an explicit `null` is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolEvent {
    #[serde(rename_all = "camelCase")]
    RunStarted {
        thread_id: String,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        run_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RunFinished {
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        thread_id: Option<String>,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        run_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RunError {
        message: String,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        code: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageStart {
        message_id: String,
        role: MessageRole,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        parent_message_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TextMessageDelta { message_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    TextMessageEnd { message_id: String },
    #[serde(rename_all = "camelCase")]
    TextMessageReasoningStart { message_id: String },
    #[serde(rename_all = "camelCase")]
    TextMessageReasoningDelta { message_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    TextMessageReasoningEnd { message_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        tool_call_name: Option<String>,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        parent_message_id: Option<String>,
    },
    /// `args` is required but may be any JSON value, `null` included.
    #[serde(rename_all = "camelCase")]
    ToolCallArgs {
        tool_call_id: String,
        args: Value,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        parent_message_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolCallEnd {
        tool_call_id: String,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        tool_call_name: Option<String>,
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        parent_message_id: Option<String>,
    },
}

/// Every `type` discriminator in the alphabet.
pub const EVENT_TYPES: [&str; 12] = [
    "RUN_STARTED",
    "RUN_FINISHED",
    "RUN_ERROR",
    "TEXT_MESSAGE_START",
    "TEXT_MESSAGE_DELTA",
    "TEXT_MESSAGE_END",
    "TEXT_MESSAGE_REASONING_START",
    "TEXT_MESSAGE_REASONING_DELTA",
    "TEXT_MESSAGE_REASONING_END",
    "TOOL_CALL_START",
    "TOOL_CALL_ARGS",
    "TOOL_CALL_END",
];

impl ProtocolEvent {
    /// The wire `type` discriminator.
    pub fn event_type(&self) -> &'static str {
        match self {
            ProtocolEvent::RunStarted { .. } => "RUN_STARTED",
            ProtocolEvent::RunFinished { .. } => "RUN_FINISHED",
            ProtocolEvent::RunError { .. } => "RUN_ERROR",
            ProtocolEvent::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            ProtocolEvent::TextMessageDelta { .. } => "TEXT_MESSAGE_DELTA",
            ProtocolEvent::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            ProtocolEvent::TextMessageReasoningStart { .. } => "TEXT_MESSAGE_REASONING_START",
            ProtocolEvent::TextMessageReasoningDelta { .. } => "TEXT_MESSAGE_REASONING_DELTA",
            ProtocolEvent::TextMessageReasoningEnd { .. } => "TEXT_MESSAGE_REASONING_END",
            ProtocolEvent::ToolCallStart { .. } => "TOOL_CALL_START",
            ProtocolEvent::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            ProtocolEvent::ToolCallEnd { .. } => "TOOL_CALL_END",
        }
    }

    /// `RUN_FINISHED` and `RUN_ERROR` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProtocolEvent::RunFinished { .. } | ProtocolEvent::RunError { .. }
        )
    }

    /// Message id for text and reasoning events.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            ProtocolEvent::TextMessageStart { message_id, .. }
            | ProtocolEvent::TextMessageDelta { message_id, .. }
            | ProtocolEvent::TextMessageEnd { message_id }
            | ProtocolEvent::TextMessageReasoningStart { message_id }
            | ProtocolEvent::TextMessageReasoningDelta { message_id, .. }
            | ProtocolEvent::TextMessageReasoningEnd { message_id } => Some(message_id),
            _ => None,
        }
    }

    /// Tool call id for tool events.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            ProtocolEvent::ToolCallStart { tool_call_id, .. }
            | ProtocolEvent::ToolCallArgs { tool_call_id, .. }
            | ProtocolEvent::ToolCallEnd { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}
