//! Payload validation: raw SSE `data` text to a typed [`ProtocolEvent`].

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use super::event::{ProtocolEvent, EVENT_TYPES};

/// Why a payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPayloadKind {
    /// Blank after trimming
    Empty,
    /// Not valid JSON
    JsonParseFailed,
    /// JSON, but not an object with a string `type`
    NotAnEvent,
    /// `type` is not in the protocol alphabet
    UnknownType,
    /// Known `type` whose fields do not match its variant
    SchemaMismatch,
}

impl InvalidPayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidPayloadKind::Empty => "empty",
            InvalidPayloadKind::JsonParseFailed => "json_parse_failed",
            InvalidPayloadKind::NotAnEvent => "not_an_event",
            InvalidPayloadKind::UnknownType => "unknown_type",
            InvalidPayloadKind::SchemaMismatch => "schema_mismatch",
        }
    }
}

impl fmt::Display for InvalidPayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected payload together with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid event payload ({kind}){}", detail_suffix(.detail))]
pub struct InvalidPayload {
    pub kind: InvalidPayloadKind,
    /// The untrimmed payload as received
    pub payload: String,
    pub detail: Option<String>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl InvalidPayload {
    pub(super) fn new(kind: InvalidPayloadKind, payload: &str, detail: Option<String>) -> Self {
        Self {
            kind,
            payload: payload.to_string(),
            detail,
        }
    }
}

/// Validate one SSE `data` payload against the protocol alphabet.
pub fn parse_event_payload(payload: &str) -> Result<ProtocolEvent, InvalidPayload> {
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

    let event_type = match value.as_object().and_then(|o| o.get("type")) {
        Some(Value::String(t)) => t.as_str(),
        _ => {
            return Err(InvalidPayload::new(
                InvalidPayloadKind::NotAnEvent,
                payload,
                None,
            ))
        }
    };

    if !EVENT_TYPES.contains(&event_type) {
        let detail = Some(format!("type {}", event_type));
        return Err(InvalidPayload::new(
            InvalidPayloadKind::UnknownType,
            payload,
            detail,
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
