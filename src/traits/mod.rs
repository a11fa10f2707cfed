//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP transport returning streaming responses
//! - [`StreamHandler`] - Receiver of adapted protocol events

pub mod handler;
pub mod http;

pub use handler::StreamHandler;
pub use http::{
    ByteStream, Headers, HttpClient, HttpError, HttpRequest, Method, Response, StreamingResponse,
};
