//! The retry/timeout/cancellation loop.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::RequestPolicy;
use crate::error::{ApiClientError, ApiErrorKind, ApiResult, Classify};

/// Whether a failed attempt (0-based) may be retried under `retry_count`.
pub fn should_retry(error: &ApiClientError, attempt: u32, retry_count: u32) -> bool {
    if attempt >= retry_count {
        return false;
    }
    if !error.is_retryable() || error.is_abort() {
        return false;
    }
    error.kind().is_retry_eligible()
}

/// Run `task` under `policy`, optionally tied to an external cancellation
/// token.
///
/// Each attempt gets a fresh child token that is cancelled when the
/// external token fires or the attempt deadline elapses; the attempt future
/// is dropped at that point. An already-cancelled external token fails with
/// `Abort` without invoking `task`. At most `retry_count + 1` attempts run.
pub async fn run_with_policy<T, E, F, Fut>(
    mut task: F,
    policy: &RequestPolicy,
    signal: Option<&CancellationToken>,
) -> ApiResult<T>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    let mut attempt: u32 = 0;
    loop {
        let error = match run_attempt(&mut task, policy.timeout(), signal).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if error.kind() == ApiErrorKind::Unauthorized {
            if let Some(hook) = &policy.on_unauthorized {
                hook().await;
            }
        }

        if !should_retry(&error, attempt, policy.retry_count) {
            debug!(
                kind = %error.kind(),
                attempts = attempt + 1,
                "Request failed: {}",
                error
            );
            return Err(error);
        }

        attempt += 1;
        let delay = policy.backoff(attempt);
        warn!(
            kind = %error.kind(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying request after error: {}",
            error
        );

        if !sleep_unless_cancelled(delay, signal).await {
            return Err(ApiClientError::abort());
        }
    }
}

async fn run_attempt<T, E, F, Fut>(
    task: &mut F,
    timeout: Option<Duration>,
    signal: Option<&CancellationToken>,
) -> ApiResult<T>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    let token = signal.map_or_else(CancellationToken::new, CancellationToken::child_token);
    if token.is_cancelled() {
        return Err(ApiClientError::abort());
    }

    let attempt = task(token.clone());
    let deadline = async move {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        result = attempt => result.map_err(Classify::classify),
        () = token.cancelled() => Err(ApiClientError::abort()),
        () = deadline => {
            token.cancel();
            Err(ApiClientError::timeout("Request timeout"))
        }
    }
}

/// Sleep for `delay`; returns false if the token fired first.
async fn sleep_unless_cancelled(delay: Duration, signal: Option<&CancellationToken>) -> bool {
    if delay.is_zero() {
        return !signal.is_some_and(CancellationToken::is_cancelled);
    }

    match signal {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        },
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}
