//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use chatwire::prelude::*;
//! ```

// Client and configuration
pub use crate::client::{fetch_api, fetch_json, fetch_with_policy, stream_sse, ChatClient};
pub use crate::config::ClientConfig;

// Errors
pub use crate::error::{classify, ApiClientError, ApiErrorKind, ApiResult};

// Request policy
pub use crate::policy::{run_with_policy, RequestPolicy, UnauthorizedGate};

// Protocol
pub use crate::protocol::{MessageRole, ProtocolAdapter, ProtocolEvent};
pub use crate::sse::{SseMessage, SseParser};

// Conversations
pub use crate::models::{ApiResponse, Conversation, Message, MessageStatus, RunAgentInput};
pub use crate::session::{ChatSession, SendOptions, SendOutcome};
pub use crate::store::ChatStore;

// Traits
pub use crate::traits::{HttpClient, HttpRequest, StreamHandler};
