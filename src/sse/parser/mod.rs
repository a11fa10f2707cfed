//! Incremental SSE stream parser.
//!
//! Chunks may split anywhere, including inside a `\r\n` pair. The parser
//! normalizes CRLF and lone CR to LF, buffers until a blank line closes a
//! block, and emits one [`SseMessage`] per non-empty block.

use crate::sse::message::{SseField, SseMessage};

/// Parse one normalized block (no CR, no terminating blank line).
///
/// Returns `None` for blocks with no data lines and no (non-empty) event.
pub fn parse_sse_block(block: &str) -> Option<SseMessage> {
    let mut event: Option<String> = None;
    let mut id: Option<String> = None;
    let mut retry: Option<u64> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.split('\n') {
        if line.is_empty() {
            continue;
        }

        match SseField::parse(line) {
            SseField::Event(value) => event = Some(value.to_string()),
            SseField::Id(value) => id = Some(value.to_string()),
            SseField::Retry(value) => {
                if let Some(parsed) = parse_retry(value) {
                    retry = Some(parsed);
                }
            }
            SseField::Data(value) => data_lines.push(value),
            SseField::Comment | SseField::Unknown => {}
        }
    }

    let has_event = event.as_deref().is_some_and(|e| !e.is_empty());
    if data_lines.is_empty() && !has_event {
        return None;
    }

    Some(SseMessage {
        event,
        id,
        retry,
        data: data_lines.join("\n"),
    })
}

/// Leading-integer parse of a `retry:` value; negatives and garbage are dropped.
///
/// Values too large for `u64` saturate to `u64::MAX`.
fn parse_retry(value: &str) -> Option<u64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }
    let parsed = digits.bytes().fold(0u64, |acc, b| {
        acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
    });

    if negative && parsed != 0 {
        return None;
    }
    Some(parsed)
}

/// Stateful SSE parser that accumulates chunks and emits complete messages.
#[derive(Debug, Default)]
pub struct SseParser {
    /// Normalized text not yet terminated by a blank line
    buffer: String,
    /// Last chunk ended in `\r`; the next chunk decides whether it was CRLF
    pending_carriage_return: bool,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a decoded chunk and return every block it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<SseMessage> {
        self.append_normalized(chunk);

        let mut messages = Vec::new();
        let mut consumed = 0;
        while let Some(rel) = self.buffer[consumed..].find("\n\n") {
            let end = consumed + rel;
            if let Some(message) = parse_sse_block(&self.buffer[consumed..end]) {
                messages.push(message);
            }
            consumed = end + 2;
        }
        self.buffer.drain(..consumed);

        messages
    }

    /// Emit whatever remains buffered at end of stream.
    ///
    /// Calling `flush` again immediately returns nothing.
    pub fn flush(&mut self) -> Vec<SseMessage> {
        if self.pending_carriage_return {
            self.buffer.push('\n');
            self.pending_carriage_return = false;
        }

        if self.buffer.trim().is_empty() {
            self.buffer.clear();
            return Vec::new();
        }

        let message = parse_sse_block(&self.buffer);
        self.buffer.clear();
        message.into_iter().collect()
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending_carriage_return = false;
    }

    fn append_normalized(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }

        let mut rest = chunk;
        if self.pending_carriage_return {
            self.pending_carriage_return = false;
            self.buffer.push('\n');
            if let Some(stripped) = rest.strip_prefix('\n') {
                rest = stripped;
            }
        }

        // CR and LF are ASCII, so byte indices here are always char boundaries.
        let bytes = rest.as_bytes();
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'\r' {
                i += 1;
                continue;
            }

            self.buffer.push_str(&rest[start..i]);
            if i + 1 < bytes.len() {
                self.buffer.push('\n');
                if bytes[i + 1] == b'\n' {
                    i += 1;
                }
            } else {
                self.pending_carriage_return = true;
            }
            i += 1;
            start = i;
        }
        self.buffer.push_str(&rest[start..]);
    }
}
