use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::MessageRole;

/// An image the user attached to a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageAttachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
            name: None,
        }
    }
}

/// One content part of an input message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputContent {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Binary { mime_type: String, data: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: Vec<InputContent>,
}

/// Extra options forwarded to the agent untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardedProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<bool>,
}

/// Body of a chat run request.
///
/// `thread_id` is left out for conversations the server has not seen yet;
/// the server then announces the new thread in `RUN_STARTED`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub run_id: String,
    pub messages: Vec<InputMessage>,
    #[serde(default)]
    pub forwarded_props: ForwardedProps,
}

impl RunAgentInput {
    /// Empty run with a fresh run id.
    pub fn new(thread_id: Option<String>) -> Self {
        Self {
            thread_id,
            run_id: new_run_id(),
            messages: Vec::new(),
            forwarded_props: ForwardedProps::default(),
        }
    }

    /// Run carrying a single user message.
    ///
    /// Blank text is left out of the content; attachments follow the text
    /// as binary parts.
    pub fn user_prompt(
        thread_id: Option<String>,
        message_id: impl Into<String>,
        text: &str,
        attachments: &[ImageAttachment],
    ) -> Self {
        let text = text.trim();
        let mut content = Vec::with_capacity(attachments.len() + 1);
        if !text.is_empty() {
            content.push(InputContent::Text {
                text: text.to_string(),
            });
        }
        content.extend(attachments.iter().map(|a| InputContent::Binary {
            mime_type: a.mime_type.clone(),
            data: a.data.clone(),
        }));

        let mut input = Self::new(thread_id);
        input.messages.push(InputMessage {
            id: message_id.into(),
            role: MessageRole::User,
            content,
        });
        input
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.forwarded_props.model = model;
        self
    }

    pub fn with_thinking(mut self, thinking: Option<bool>) -> Self {
        self.forwarded_props.thinking = thinking;
        self
    }
}

/// `run_<uuid v4>`
pub fn new_run_id() -> String {
    format!("run_{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_prompt_wire_shape() {
        let input = RunAgentInput::user_prompt(
            Some("thread-1".to_string()),
            "m1",
            "  hello  ",
            &[ImageAttachment::new("image/png", "aGk=")],
        )
        .with_model(Some("gpt-4o".to_string()))
        .with_thinking(Some(true));

        let mut value = serde_json::to_value(&input).unwrap();
        let run_id = value["runId"].as_str().unwrap().to_string();
        assert!(run_id.starts_with("run_"));
        value.as_object_mut().unwrap().remove("runId");

        assert_eq!(
            value,
            json!({
                "threadId": "thread-1",
                "messages": [{
                    "id": "m1",
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "hello"},
                        {"type": "binary", "mimeType": "image/png", "data": "aGk="}
                    ]
                }],
                "forwardedProps": {"model": "gpt-4o", "thinking": true}
            })
        );
    }

    #[test]
    fn test_local_thread_and_empty_props_are_omitted() {
        let input = RunAgentInput::user_prompt(None, "m1", "hi", &[]);
        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("threadId").is_none());
        assert_eq!(value["forwardedProps"], json!({}));
    }

    #[test]
    fn test_blank_text_with_attachment_only() {
        let input =
            RunAgentInput::user_prompt(None, "m1", "   ", &[ImageAttachment::new("image/jpeg", "x")]);
        assert_eq!(
            input.messages[0].content,
            vec![InputContent::Binary {
                mime_type: "image/jpeg".to_string(),
                data: "x".to_string(),
            }]
        );
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(new_run_id(), new_run_id());
    }

    #[test]
    fn test_thinking_false_is_forwarded() {
        let input = RunAgentInput::new(None).with_thinking(Some(false));
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["forwardedProps"], json!({"thinking": false}));
    }
}
