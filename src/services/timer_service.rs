//! Scheduled room work: question deadlines, delayed advances, and cleanup.
//!
//! Every timer is keyed by `(pin, kind)`. Scheduling on an occupied slot
//! aborts the previous task, so a room never has two competing deadlines of
//! the same kind. Callbacks run on the Tokio runtime and are expected to
//! revalidate room state themselves; a timer firing late against a room that
//! already moved on must be a no-op in the callback.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::trace;

/// What a scheduled task is for. One live timer per kind per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Auto-close of the question in play.
    QuestionDeadline,
    /// Delayed advance (or finish) after a question ends.
    AdvanceDelay,
    /// Removal of a finished room after its grace period.
    Cleanup,
}

struct TimerSlot {
    generation: u64,
    abort: AbortHandle,
}

struct Inner {
    timers: DashMap<(String, TimerKind), TimerSlot>,
    generation: AtomicU64,
}

/// Registry of pending per-room timers.
#[derive(Clone)]
pub struct TimerRegistry {
    inner: Arc<Inner>,
}

impl TimerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                timers: DashMap::new(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Run `task` after `delay`, replacing any pending timer under the same key.
    pub fn schedule<F>(&self, pin: &str, kind: TimerKind, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = (pin.to_string(), kind);
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        let cleanup_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Release the slot before running the callback. The callback may
            // cancel or reschedule this very key; if the slot still pointed at
            // this task, that would abort the callback mid-flight.
            inner
                .timers
                .remove_if(&cleanup_key, |_, slot| slot.generation == generation);
            task.await;
        });

        trace!(pin, ?kind, ?delay, "timer scheduled");
        if let Some(previous) = self.inner.timers.insert(
            key,
            TimerSlot {
                generation,
                abort: handle.abort_handle(),
            },
        ) {
            previous.abort.abort();
        }
    }

    /// Abort the pending timer under `(pin, kind)`. Returns whether one existed.
    pub fn cancel(&self, pin: &str, kind: TimerKind) -> bool {
        match self.inner.timers.remove(&(pin.to_string(), kind)) {
            Some((_, slot)) => {
                slot.abort.abort();
                trace!(pin, ?kind, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer for one room.
    pub fn cancel_room(&self, pin: &str) {
        self.inner.timers.retain(|(timer_pin, _), slot| {
            if timer_pin == pin {
                slot.abort.abort();
                false
            } else {
                true
            }
        });
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.inner.timers.len()
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
