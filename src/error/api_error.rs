//! The unified error value surfaced by every transport operation.

use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::kind::ApiErrorKind;

/// Shared, thread-safe underlying cause.
pub type ErrorSource = Arc<dyn StdError + Send + Sync + 'static>;

/// Server-provided error code, either symbolic or numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Text(String),
    Number(i64),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Text(code) => f.write_str(code),
            ErrorCode::Number(code) => write!(f, "{}", code),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        ErrorCode::Text(code.to_string())
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        ErrorCode::Number(code)
    }
}

/// A classified transport failure.
///
/// Values are built through the kind-specific constructors and are read-only
/// afterwards. `retryable` is derived from the kind (and, for HTTP errors,
/// from the status) and cannot be set directly.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiClientError {
    kind: ApiErrorKind,
    message: String,
    status: Option<u16>,
    code: Option<ErrorCode>,
    retryable: bool,
    payload: Option<Value>,
    #[source]
    cause: Option<ErrorSource>,
}

impl ApiClientError {
    fn new(kind: ApiErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            code: None,
            retryable,
            payload: None,
            cause: None,
        }
    }

    /// The caller cancelled the request.
    pub fn abort() -> Self {
        Self::new(ApiErrorKind::Abort, "Request aborted", false)
    }

    /// The per-attempt deadline elapsed.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message, true)
    }

    /// The request failed before any response was received.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Network error".to_string()
        } else {
            message
        };
        Self::new(ApiErrorKind::Network, message, true)
    }

    /// An unclassifiable failure. Never retried.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unknown, message, false)
    }

    /// A server-side business failure carried inside a successful response.
    pub fn business(code: i64, message: Option<&str>) -> Self {
        let message = match message {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => format!("Business error: {}", code),
        };
        let mut error = Self::new(ApiErrorKind::Business, message, false);
        error.code = Some(ErrorCode::Number(code));
        error
    }

    /// Build an error from a non-2xx HTTP response.
    ///
    /// 401 becomes [`ApiErrorKind::Unauthorized`]; every other status is
    /// [`ApiErrorKind::Http`], retryable for 429 and 5xx. The message prefers
    /// a `msg`, `message` or `error` string in the payload, then the status
    /// text, then `HTTP <status>`.
    pub fn http_status(status: u16, status_text: &str, payload: Option<Value>) -> Self {
        let payload_message = payload.as_ref().and_then(read_error_message);

        let mut error = if status == 401 {
            Self::new(
                ApiErrorKind::Unauthorized,
                payload_message.unwrap_or("Unauthorized"),
                false,
            )
        } else {
            let message = match payload_message {
                Some(m) => m.to_string(),
                None if !status_text.trim().is_empty() => status_text.to_string(),
                None => format!("HTTP {}", status),
            };
            Self::new(
                ApiErrorKind::Http,
                message,
                status == 429 || status >= 500,
            )
        };
        error.status = Some(status);
        error.payload = payload;
        error
    }

    /// Attach a server-provided error code.
    pub fn with_code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach the status observed alongside a non-HTTP failure.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the raw payload that produced this error.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(source));
        self
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_abort(&self) -> bool {
        self.kind == ApiErrorKind::Abort
    }

    /// Stable identifier for logs and telemetry.
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            ApiErrorKind::Business => "E_API_BUSINESS",
            ApiErrorKind::Network => "E_API_NETWORK",
            ApiErrorKind::Timeout => "E_API_TIMEOUT",
            ApiErrorKind::Abort => "E_API_ABORTED",
            ApiErrorKind::Unauthorized => "E_API_UNAUTHORIZED",
            ApiErrorKind::Http => match self.status {
                Some(429) => "E_API_RATE_LIMITED",
                Some(s) if s >= 500 => "E_API_SERVER",
                _ => "E_API_HTTP",
            },
            ApiErrorKind::Unknown => "E_API_UNKNOWN",
        }
    }

    /// A message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::Network => {
                "Unable to reach the server. Please check your connection.".to_string()
            }
            ApiErrorKind::Timeout => {
                "The server took too long to respond. Please try again.".to_string()
            }
            ApiErrorKind::Abort => "The request was cancelled.".to_string(),
            ApiErrorKind::Unauthorized => "Authentication required. Please sign in again.".to_string(),
            ApiErrorKind::Http => match self.status {
                Some(429) => "Too many requests. Please wait a moment and try again.".to_string(),
                Some(s) if s >= 500 => {
                    "The server is experiencing issues. Please try again later.".to_string()
                }
                _ => self.message.clone(),
            },
            ApiErrorKind::Business | ApiErrorKind::Unknown => self.message.clone(),
        }
    }
}

/// Extract a human-readable message from an error payload.
///
/// Looks at `msg`, `message` and `error` in that order and ignores blank
/// strings. Non-object payloads yield nothing.
pub fn read_error_message(payload: &Value) -> Option<&str> {
    let object = payload.as_object()?;
    ["msg", "message", "error"].iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    })
}
