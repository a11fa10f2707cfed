//! SSE message and field types.

use serde::Serialize;

/// One dispatched Server-Sent Events block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SseMessage {
    /// Value of the last `event:` field in the block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Value of the last `id:` field in the block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Reconnection hint from a well-formed `retry:` field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
    /// All `data:` values joined with `\n`
    pub data: String,
}

impl SseMessage {
    /// Create a message carrying only data.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }
}

/// A single field line inside an SSE block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseField<'a> {
    Event(&'a str),
    Id(&'a str),
    Retry(&'a str),
    Data(&'a str),
    /// Comment line (starts with ':')
    Comment,
    /// Any field name this parser does not know
    Unknown,
}

impl<'a> SseField<'a> {
    /// Split a line into field name and value.
    ///
    /// A line without a colon is a field whose value is empty. A single
    /// space after the colon is removed from the value.
    pub fn parse(line: &'a str) -> Self {
        if line.starts_with(':') {
            return SseField::Comment;
        }

        let (name, raw_value) = match line.find(':') {
            Some(idx) => (&line[..idx], &line[idx + 1..]),
            None => (line, ""),
        };
        let value = raw_value.strip_prefix(' ').unwrap_or(raw_value);

        match name {
            "event" => SseField::Event(value),
            "id" => SseField::Id(value),
            "retry" => SseField::Retry(value),
            "data" => SseField::Data(value),
            _ => SseField::Unknown,
        }
    }
}
