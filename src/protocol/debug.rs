//! Node execution frames of a graph debug run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::event::present;
use super::validate::{InvalidPayload, InvalidPayloadKind};

/// One debug-run frame: `{"type": ..., "content": {"node_key": ..., ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseData {
    #[serde(rename = "type")]
    pub data_type: String,
    pub content: SseDataContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseDataContent {
    pub node_key: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub metrics: Option<ExecutionMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Milliseconds
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<f64>,
}

/// Validate one debug-run `data` payload.
///
/// Rejections are `Empty`, `JsonParseFailed` or `SchemaMismatch`.
pub fn parse_sse_data_payload(payload: &str) -> Result<SseData, InvalidPayload> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(InvalidPayload::new(InvalidPayloadKind::Empty, payload, None));
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        InvalidPayload::new(
            InvalidPayloadKind::JsonParseFailed,
            payload,
            Some(e.to_string()),
        )
    })?;

    // serde would also accept arrays for these structs.
    let content = value.as_object().and_then(|o| o.get("content"));
    let metrics = content.and_then(Value::as_object).and_then(|c| c.get("metrics"));
    let shaped = content.is_some_and(Value::is_object)
        && metrics.map_or(true, Value::is_object);
    if !shaped {
        return Err(InvalidPayload::new(
            InvalidPayloadKind::SchemaMismatch,
            payload,
            None,
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        InvalidPayload::new(
            InvalidPayloadKind::SchemaMismatch,
            payload,
            Some(e.to_string()),
        )
    })
}
