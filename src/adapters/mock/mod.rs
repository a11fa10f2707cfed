//! Mock implementations for testing.
//!
//! Enables unit testing of the transport without network access.

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
