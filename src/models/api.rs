use serde::{Deserialize, Serialize};

use super::deserialize_id;
use crate::error::{ApiClientError, ApiResult};

/// The `{code, msg, data}` envelope of the devtools endpoints.
///
/// HTTP 200 only means the request reached the server; `code` decides
/// whether it succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Pass a zero-code envelope through; anything else becomes a
    /// `business` error carrying the code and the server's `msg`.
    pub fn ensure_success(self) -> ApiResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self
            .msg
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Business request failed");
        Err(ApiClientError::business(self.code, Some(message)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Graph {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphListResponse {
    #[serde(default)]
    pub graphs: Vec<Graph>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebugThreadResponse {
    pub thread_id: String,
}

/// Body of a debug run: execute the graph from `from_node` with `input`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebugRunRequest {
    pub from_node: String,
    /// Node input, JSON-encoded
    pub input: String,
    pub log_id: String,
}
