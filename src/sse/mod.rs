//! SSE (Server-Sent Events) stream parsing
//!
//! SSE format consists of:
//! - `event: <type>` - event name line
//! - `id: <id>` / `retry: <ms>` - optional metadata lines
//! - `data: <payload>` - data line, repeatable
//! - Empty line - signals end of a block
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `message` - [`SseMessage`] and line-level field parsing
//! - `parser` - [`SseParser`], the chunk-boundary-safe block parser
//! - `decoder` - [`Utf8ChunkDecoder`] for byte chunks from the network

mod decoder;
mod message;
mod parser;

pub use decoder::Utf8ChunkDecoder;
pub use message::{SseField, SseMessage};
pub use parser::{parse_sse_block, SseParser};
