//! chatwire - streaming chat transport for AG-UI style agent backends
//!
//! SSE parsing, request policies with retries and cancellation, protocol
//! event adaptation and a conversation store fed by streamed runs.

pub mod adapters;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fence;
pub mod models;
pub mod policy;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod sse;
pub mod store;
pub mod traits;
