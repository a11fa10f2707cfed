//! Normalization of arbitrary failures into [`ApiClientError`].
//!
//! Anything that can fail inside a policy-wrapped task implements
//! [`Classify`]; the policy engine only ever sees the classified value.

use super::api_error::ApiClientError;
use crate::traits::HttpError;

/// Conversion of a failure into a classified [`ApiClientError`].
///
/// Classifying an `ApiClientError` returns it unchanged.
pub trait Classify {
    fn classify(self) -> ApiClientError;
}

/// Free-function form of [`Classify::classify`], handy in `map_err`.
pub fn classify<E: Classify>(error: E) -> ApiClientError {
    error.classify()
}

impl Classify for ApiClientError {
    fn classify(self) -> ApiClientError {
        self
    }
}

impl Classify for HttpError {
    fn classify(self) -> ApiClientError {
        let source = self.clone();
        match self {
            HttpError::ConnectionFailed(msg) | HttpError::Io(msg) => {
                ApiClientError::network(msg).with_source(source)
            }
            HttpError::Timeout(_) => ApiClientError::timeout("Request timeout").with_source(source),
            HttpError::ServerError { status, message } => {
                ApiClientError::http_status(status, &message, None)
            }
            HttpError::Cancelled => ApiClientError::abort(),
            HttpError::InvalidUrl(_) | HttpError::Other(_) => {
                ApiClientError::unknown(source.to_string()).with_source(source)
            }
        }
    }
}

impl Classify for reqwest::Error {
    fn classify(self) -> ApiClientError {
        classify_reqwest_error(self)
    }
}

impl Classify for serde_json::Error {
    fn classify(self) -> ApiClientError {
        ApiClientError::unknown(format!("Invalid JSON response: {}", self)).with_source(self)
    }
}

impl Classify for std::io::Error {
    fn classify(self) -> ApiClientError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::TimedOut => ApiClientError::timeout("Request timeout").with_source(self),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => {
                ApiClientError::network(self.to_string()).with_source(self)
            }
            _ => ApiClientError::unknown(self.to_string()).with_source(self),
        }
    }
}

/// Classify a reqwest error.
///
/// Timeouts map to `Timeout`, connection and request/body failures to
/// `Network`, status errors to `Http`/`Unauthorized`, the rest to `Unknown`.
pub fn classify_reqwest_error(err: reqwest::Error) -> ApiClientError {
    if err.is_timeout() {
        return ApiClientError::timeout("Request timeout").with_source(err);
    }

    if let Some(status) = err.status() {
        let reason = status.canonical_reason().unwrap_or_default();
        return ApiClientError::http_status(status.as_u16(), reason, None).with_source(err);
    }

    if err.is_connect() || err.is_request() || err.is_body() {
        return ApiClientError::network(err.to_string()).with_source(err);
    }

    ApiClientError::unknown(err.to_string()).with_source(err)
}
