//! AG-UI protocol events over SSE.
//!
//! # Module structure
//! - `event` - [`ProtocolEvent`], the closed event alphabet
//! - `validate` - per-variant payload validation with rejection reasons
//! - `adapter` - [`ProtocolAdapter`], done-once semantics and strict mode
//! - `debug` - [`SseData`], node execution frames of graph debug runs

mod adapter;
mod debug;
mod event;
mod validate;

pub use adapter::{AdapterOptions, ProtocolAdapter, DONE_SENTINEL, INCOMPLETE_STREAM_MESSAGE};
pub use debug::{parse_sse_data_payload, ExecutionMetrics, SseData, SseDataContent};
pub use event::{MessageRole, ProtocolEvent, EVENT_TYPES};
pub use validate::{parse_event_payload, InvalidPayload, InvalidPayloadKind};
