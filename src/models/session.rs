use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_nullable_string};
use crate::protocol::MessageRole;

/// A conversation tree as listed by the sessions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub title: String,
    /// Branch id used for follow-up API calls
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub last_active_session_id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub last_message: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub updated_at: String,
}

impl Session {
    /// `updated_at` as epoch milliseconds, or None when it is not RFC 3339.
    pub fn updated_at_millis(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(&self.updated_at)
            .ok()
            .map(|dt| dt.timestamp_millis())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionListResponse {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// One stored message of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMessage {
    pub role: MessageRole,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Only set on assistant messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMessagesResponse {
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

/// A whole assistant run folded into one reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessageResponse {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_list_deserialize() {
        let response: SessionListResponse = serde_json::from_value(json!({
            "sessions": [{
                "id": "tree_1",
                "title": "Rust questions",
                "last_active_session_id": "sess_9",
                "last_message": "Sure!",
                "created_at": "2024-05-01T10:00:00Z",
                "updated_at": "2024-05-01T10:05:00Z"
            }]
        }))
        .unwrap();

        let session = &response.sessions[0];
        assert_eq!(session.id, "tree_1");
        assert_eq!(session.last_active_session_id, "sess_9");
        assert_eq!(session.updated_at_millis(), Some(1_714_557_900_000));
    }

    #[test]
    fn test_session_tolerates_numeric_id_and_nulls() {
        let session: Session = serde_json::from_value(json!({
            "id": 42,
            "title": null,
            "updated_at": "yesterday"
        }))
        .unwrap();
        assert_eq!(session.id, "42");
        assert_eq!(session.title, "");
        assert_eq!(session.last_message, "");
        assert_eq!(session.updated_at_millis(), None);
    }

    #[test]
    fn test_missing_sessions_key_is_empty() {
        let response: SessionListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.sessions.is_empty());
    }

    #[test]
    fn test_session_messages_deserialize() {
        let response: SessionMessagesResponse = serde_json::from_value(json!({
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello", "reasoning_content": "greet", "model": "m"},
                {"role": "tool", "content": null}
            ]
        }))
        .unwrap();
        assert_eq!(response.messages.len(), 3);
        assert_eq!(response.messages[1].model.as_deref(), Some("m"));
        assert_eq!(response.messages[2].role, MessageRole::Tool);
        assert_eq!(response.messages[2].content, "");
    }

    #[test]
    fn test_chat_response_omits_missing_reasoning() {
        let response = ChatMessageResponse {
            role: MessageRole::Assistant,
            content: "done".to_string(),
            reasoning_content: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"role": "assistant", "content": "done"})
        );
    }
}
