//! Callback surface for adapted protocol streams.

use crate::error::ApiClientError;
use crate::protocol::{InvalidPayload, ProtocolEvent};

/// Receives the output of a [`ProtocolAdapter`](crate::protocol::ProtocolAdapter).
///
/// Only `on_event` is required. `on_done` fires at most once per stream.
/// `on_invalid` sees frames that failed validation when strict mode is on.
/// `on_error` sees the classified failure before the stream call returns it.
pub trait StreamHandler {
    fn on_event(&mut self, event: ProtocolEvent);

    fn on_done(&mut self) {}

    fn on_invalid(&mut self, _invalid: &InvalidPayload) {}

    fn on_error(&mut self, _error: &ApiClientError) {}
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_event(&mut self, event: ProtocolEvent) {
        (**self).on_event(event)
    }

    fn on_done(&mut self) {
        (**self).on_done()
    }

    fn on_invalid(&mut self, invalid: &InvalidPayload) {
        (**self).on_invalid(invalid)
    }

    fn on_error(&mut self, error: &ApiClientError) {
        (**self).on_error(error)
    }
}
