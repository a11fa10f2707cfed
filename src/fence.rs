//! Streaming request lifecycle fencing.
//!
//! At most one streaming request is active. Starting a new one cancels the
//! previous one and hands out a strictly larger request id; completions and
//! events carrying an older id are ignored.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The current request's id and cancellation token.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    request_id: u64,
    token: CancellationToken,
}

impl StreamHandle {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct FenceSlot {
    counter: u64,
    active: Option<CancellationToken>,
}

/// Single-slot fence guarding one logical conversation stream.
#[derive(Debug, Default)]
pub struct StreamFence {
    slot: Mutex<FenceSlot>,
}

impl StreamFence {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, FenceSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel whatever is active and install a new request.
    pub fn begin(&self) -> StreamHandle {
        let mut slot = self.slot();
        if let Some(previous) = slot.active.take() {
            debug!(request_id = slot.counter, "Preempting active stream");
            previous.cancel();
        }

        slot.counter += 1;
        let token = CancellationToken::new();
        slot.active = Some(token.clone());

        StreamHandle {
            request_id: slot.counter,
            token,
        }
    }

    /// Retire `request_id` if it is still the current request.
    ///
    /// Returns false, leaving the slot untouched, for a superseded id.
    pub fn complete(&self, request_id: u64) -> bool {
        let mut slot = self.slot();
        if slot.counter != request_id {
            debug!(request_id, current = slot.counter, "Ignoring stale completion");
            return false;
        }
        slot.active = None;
        true
    }

    /// Cancel the active request and clear the slot.
    ///
    /// The counter also advances so that late results of the cancelled
    /// request are no longer current. Returns whether anything was active.
    pub fn abort(&self) -> bool {
        let mut slot = self.slot();
        let previous = slot.active.take();
        slot.counter += 1;
        match previous {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether `request_id` is the most recently issued id.
    pub fn is_current(&self, request_id: u64) -> bool {
        self.slot().counter == request_id
    }

    /// Whether a request is active (begun and neither completed nor aborted).
    pub fn is_active(&self) -> bool {
        self.slot().active.is_some()
    }

    /// Id of the active request, if any.
    pub fn active_request_id(&self) -> Option<u64> {
        let slot = self.slot();
        slot.active.as_ref().map(|_| slot.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_allocates_increasing_ids() {
        let fence = StreamFence::new();
        let a = fence.begin();
        let b = fence.begin();
        let c = fence.begin();
        assert!(a.request_id() < b.request_id());
        assert!(b.request_id() < c.request_id());
        assert_eq!(fence.active_request_id(), Some(c.request_id()));
    }

    #[test]
    fn test_begin_cancels_previous() {
        let fence = StreamFence::new();
        let first = fence.begin();
        assert!(!first.is_cancelled());

        let second = fence.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_stale_complete_is_ignored() {
        let fence = StreamFence::new();
        let first = fence.begin();
        let second = fence.begin();

        assert!(!fence.complete(first.request_id()));
        assert!(fence.is_active());
        assert_eq!(fence.active_request_id(), Some(second.request_id()));

        assert!(fence.complete(second.request_id()));
        assert!(!fence.is_active());
    }

    #[test]
    fn test_complete_does_not_cancel() {
        let fence = StreamFence::new();
        let handle = fence.begin();
        assert!(fence.complete(handle.request_id()));
        assert!(!handle.is_cancelled());
        // The finished request is still the latest one issued.
        assert!(fence.is_current(handle.request_id()));
    }

    #[test]
    fn test_abort_cancels_and_retires() {
        let fence = StreamFence::new();
        let handle = fence.begin();

        assert!(fence.abort());
        assert!(handle.is_cancelled());
        assert!(!fence.is_active());
        assert!(!fence.is_current(handle.request_id()));

        // Late completion of the aborted request is a no-op.
        assert!(!fence.complete(handle.request_id()));
    }

    #[test]
    fn test_abort_when_idle() {
        let fence = StreamFence::new();
        assert!(!fence.abort());
        let handle = fence.begin();
        assert_eq!(handle.request_id(), 2);
    }

    #[test]
    fn test_shared_across_threads() {
        let fence = std::sync::Arc::new(StreamFence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let fence = std::sync::Arc::clone(&fence);
                std::thread::spawn(move || fence.begin().request_id())
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(fence.active_request_id(), Some(8));
    }
}
