//! HTTP layer over the [`HttpClient`](crate::traits::HttpClient) seam.
//!
//! # Module structure
//! - `fetch` - [`fetch_with_policy`] and JSON requests under a [`RequestPolicy`](crate::policy::RequestPolicy)
//! - `stream` - [`stream_sse`], response bodies as SSE messages
//! - `chat` - [`ChatClient`], the chat run and session endpoints
//! - `devops` - graph devtools endpoints on [`ChatClient`]

mod chat;
mod devops;
mod fetch;
mod stream;

pub use chat::ChatClient;
pub use fetch::{fetch_api, fetch_json, fetch_with_policy, parse_response_body};
pub use stream::stream_sse;
