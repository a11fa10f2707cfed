//! Process-wide handling of 401 responses.
//!
//! Many requests can fail with 401 at once (an expired session hits every
//! in-flight call). The gate lets only the first of a concurrent burst run
//! the handler; the rest return immediately.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};

use super::UnauthorizedHook;

/// Boxed error returned by unauthorized handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Serializes calls to a registered unauthorized handler.
#[derive(Default)]
pub struct UnauthorizedGate {
    handler: RwLock<Option<Handler>>,
    handling: AtomicBool,
}

/// Clears the in-progress flag even if the notify future is dropped.
struct HandlingGuard<'a>(&'a AtomicBool);

impl Drop for HandlingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UnauthorizedGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler, replacing any previous one.
    pub fn set_handler<F, Fut>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move || -> BoxFuture<'static, Result<(), BoxError>> { Box::pin(handler()) });
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Remove the handler; later notifications become no-ops.
    pub fn clear_handler(&self) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run the handler unless one is already running.
    ///
    /// Returns whether this call ran the handler. Handler failures are
    /// logged and swallowed.
    pub async fn notify(&self) -> bool {
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(handler) = handler else {
            return false;
        };

        if self.handling.swap(true, Ordering::SeqCst) {
            debug!("Unauthorized handler already running, skipping");
            return false;
        }
        let _guard = HandlingGuard(&self.handling);

        if let Err(e) = handler().await {
            error!("Error handling 401 unauthorized: {}", e);
        }
        true
    }

    /// Adapt the gate into a policy hook.
    pub fn hook(self: &Arc<Self>) -> UnauthorizedHook {
        let gate = Arc::clone(self);
        Arc::new(move || -> BoxFuture<'static, ()> {
            let gate = Arc::clone(&gate);
            Box::pin(async move {
                gate.notify().await;
            })
        })
    }
}

impl std::fmt::Debug for UnauthorizedGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedGate")
            .field("has_handler", &self.has_handler())
            .field("handling", &self.handling.load(Ordering::SeqCst))
            .finish()
    }
}
