//! Error handling for the chat transport.
//!
//! All failures crossing a public boundary are an [`ApiClientError`]:
//!
//! - **Kinds**: [`ApiErrorKind`] drives retry decisions and user messaging
//! - **Constructors**: `http_status`, `business`, `timeout`, `abort`, ...
//! - **Classification**: [`Classify`] turns reqwest, IO, JSON and
//!   [`HttpError`](crate::traits::HttpError) failures into the unified value
//!
//! | Kind | Produced by | Retryable |
//! |------|-------------|-----------|
//! | network | connect/reset/body read failures | Yes |
//! | timeout | per-attempt deadline | Yes |
//! | http | non-2xx other than 401 | 429 and 5xx |
//! | unauthorized | HTTP 401 | No |
//! | business | error code inside a 2xx body | No |
//! | abort | caller cancellation | No |
//! | unknown | everything else | No |

mod api_error;
mod classify;
mod kind;

pub use api_error::{read_error_message, ApiClientError, ErrorCode, ErrorSource};
pub use classify::{classify, classify_reqwest_error, Classify};
pub use kind::ApiErrorKind;

/// Result alias for transport operations.
pub type ApiResult<T> = Result<T, ApiClientError>;
