//! SSE message stream to protocol event stream.

use tracing::warn;

use super::validate::{parse_event_payload, InvalidPayload};
use crate::error::ApiClientError;
use crate::sse::SseMessage;
use crate::traits::StreamHandler;

/// Sentinel payload that ends a stream without being an event.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Reported when the transport ends before any completion signal.
pub const INCOMPLETE_STREAM_MESSAGE: &str =
    "The stream was interrupted and cannot be resumed automatically. Please send the message again.";

/// Adapter behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Forward every invalid frame to `StreamHandler::on_invalid`
    pub strict: bool,
}

/// Turns SSE messages into validated [`ProtocolEvent`](super::ProtocolEvent)s
/// and guarantees at most one `on_done` per stream.
///
/// One adapter serves exactly one stream.
#[derive(Debug)]
pub struct ProtocolAdapter<H> {
    handler: H,
    options: AdapterOptions,
    done_notified: bool,
    invalid_logged: bool,
    invalid_count: usize,
}

impl<H: StreamHandler> ProtocolAdapter<H> {
    pub fn new(handler: H) -> Self {
        Self::with_options(handler, AdapterOptions::default())
    }

    pub fn with_options(handler: H, options: AdapterOptions) -> Self {
        Self {
            handler,
            options,
            done_notified: false,
            invalid_logged: false,
            invalid_count: 0,
        }
    }

    /// Handle one SSE message; only its `data` is looked at.
    pub fn handle_message(&mut self, message: &SseMessage) {
        self.handle_data(&message.data);
    }

    /// Handle one raw `data` payload.
    pub fn handle_data(&mut self, data: &str) {
        let payload = data.trim();
        if payload.is_empty() {
            return;
        }

        if payload == DONE_SENTINEL {
            self.notify_done();
            return;
        }

        match parse_event_payload(payload) {
            Ok(event) => {
                let terminal = event.is_terminal();
                self.handler.on_event(event);
                if terminal {
                    self.notify_done();
                }
            }
            Err(invalid) => self.report_invalid(invalid),
        }
    }

    /// Fail with a non-retryable `unknown` error unless done was signalled.
    pub fn ensure_completed(&self) -> Result<(), ApiClientError> {
        if self.done_notified {
            return Ok(());
        }
        Err(ApiClientError::unknown(INCOMPLETE_STREAM_MESSAGE))
    }

    pub fn is_done(&self) -> bool {
        self.done_notified
    }

    /// Frames rejected so far.
    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    fn notify_done(&mut self) {
        if self.done_notified {
            return;
        }
        self.done_notified = true;
        self.handler.on_done();
    }

    fn report_invalid(&mut self, invalid: InvalidPayload) {
        self.invalid_count += 1;

        if self.options.strict {
            warn!(kind = %invalid.kind, "Invalid SSE event payload: {}", invalid.payload);
            self.handler.on_invalid(&invalid);
            return;
        }

        if !self.invalid_logged {
            self.invalid_logged = true;
            warn!(kind = %invalid.kind, "Ignore invalid SSE event payload: {}", invalid.payload);
        }
    }
}
