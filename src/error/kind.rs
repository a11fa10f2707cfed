//! Error kind classification.
//!
//! Every failure that leaves the transport layer carries exactly one
//! [`ApiErrorKind`]. Retry decisions, user-facing messages and logging all
//! branch on the kind rather than on the concrete source error.

use serde::Serialize;
use std::fmt;

/// High-level categorization of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiErrorKind {
    /// The server answered, but with a non-success business code.
    Business,
    /// The request never produced a response (DNS, connect, reset).
    Network,
    /// The per-attempt deadline elapsed.
    Timeout,
    /// The caller cancelled the request.
    Abort,
    /// HTTP 401.
    Unauthorized,
    /// Any other non-2xx HTTP status.
    Http,
    /// Anything that could not be classified.
    Unknown,
}

impl ApiErrorKind {
    /// Returns a short label for the kind suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::Business => "business",
            ApiErrorKind::Network => "network",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::Abort => "abort",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::Http => "http",
            ApiErrorKind::Unknown => "unknown",
        }
    }

    /// Kinds the policy engine is allowed to retry at all.
    ///
    /// An error of one of these kinds is still only retried when its own
    /// `retryable` flag is set (an HTTP 404 is `Http` but not retryable).
    pub fn is_retry_eligible(&self) -> bool {
        matches!(
            self,
            ApiErrorKind::Network | ApiErrorKind::Timeout | ApiErrorKind::Http
        )
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
