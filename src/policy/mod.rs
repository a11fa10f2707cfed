//! Request policies: per-attempt timeout, bounded retry with linear
//! backoff, external cancellation and the unauthorized hook.
//!
//! ```ignore
//! use chatwire::policy::{run_with_policy, RequestPolicy};
//!
//! let policy = RequestPolicy::default().with_retry_count(2);
//! let value = run_with_policy(|token| fetch_once(token), &policy, None).await?;
//! ```

mod runner;
mod unauthorized;

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use runner::{run_with_policy, should_retry};
pub use unauthorized::{BoxError, UnauthorizedGate};

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Base delay between attempts; attempt `n` waits `n` times this.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

/// Awaited once per unauthorized failure, before the retry decision.
pub type UnauthorizedHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// How a single logical request is attempted.
#[derive(Clone)]
pub struct RequestPolicy {
    /// Per-attempt deadline in milliseconds; 0 disables it
    pub timeout_ms: u64,
    /// Extra attempts after the first
    pub retry_count: u32,
    /// Base backoff in milliseconds
    pub retry_delay_ms: u64,
    pub on_unauthorized: Option<UnauthorizedHook>,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_count: 0,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            on_unauthorized: None,
        }
    }
}

impl RequestPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Install the unauthorized hook.
    pub fn with_on_unauthorized<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: UnauthorizedHook = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(hook()) });
        self.on_unauthorized = Some(hook);
        self
    }

    /// Install an already boxed unauthorized hook.
    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    /// The per-attempt deadline, if enabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

impl fmt::Debug for RequestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPolicy")
            .field("timeout_ms", &self.timeout_ms)
            .field("retry_count", &self.retry_count)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("on_unauthorized", &self.on_unauthorized.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RequestPolicy::default();
        assert_eq!(policy.timeout_ms, 15_000);
        assert_eq!(policy.retry_count, 0);
        assert_eq!(policy.retry_delay_ms, 250);
        assert!(policy.on_unauthorized.is_none());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        assert_eq!(RequestPolicy::default().with_timeout_ms(0).timeout(), None);
        assert_eq!(
            RequestPolicy::default().with_timeout_ms(50).timeout(),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RequestPolicy::default().with_retry_delay_ms(100);
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(300));
    }

    #[test]
    fn test_debug_hides_hook() {
        let policy = RequestPolicy::default().with_on_unauthorized(|| async {});
        let rendered = format!("{:?}", policy);
        assert!(rendered.contains("on_unauthorized: true"));
    }
}
