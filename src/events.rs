//! Event broadcasting for pool lifecycle observability.
//!
//! [`PoolEvent`] variants are emitted as resources move through the pool and
//! carried on an [`EventBus`] backed by `tokio::sync::broadcast`. Factory
//! failures during the pool's own bookkeeping surface here rather than as
//! rejections of unrelated calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::error::Error;

// ---------------------------------------------------------------------------
// PoolEvent
// ---------------------------------------------------------------------------

/// Events emitted during pool operation.
///
/// Subscribers receive cloned copies via [`EventBus::subscribe`]; errors are
/// shared behind `Arc` since broadcast requires `Clone`.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A factory-built resource joined the pool.
    ResourceCreated {
        /// Pool-assigned resource id.
        id: u64,
    },
    /// A resource left the pool and its destroy settled.
    ResourceDestroyed {
        /// Pool-assigned resource id.
        id: u64,
    },
    /// A waiter was handed a resource.
    Acquired {
        /// How long the waiter was queued.
        waited: Duration,
    },
    /// A borrowed resource came back.
    Released {
        /// How long the client held it.
        held: Duration,
    },
    /// `factory.create` failed. The pool re-attempts creation while
    /// waiters remain and capacity is spare.
    FactoryCreateError {
        /// The factory's error.
        error: Arc<Error>,
    },
    /// `factory.destroy` failed or exceeded its deadline. The resource is
    /// gone from the pool either way.
    FactoryDestroyError {
        /// The factory's error, or [`Error::DestroyTimeout`].
        error: Arc<Error>,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast-based event bus for pool events.
///
/// Emission is fire-and-forget: with no subscribers, or with the buffer
/// full, events are dropped without backpressure on the pool. Unsubscribing
/// is dropping the receiver.
pub struct EventBus {
    sender: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer size.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: PoolEvent) {
        // A send error just means nobody is listening.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted after this call. A subscriber that
    /// falls behind by more than the buffer size receives a `Lagged`
    /// error and skips to the most recent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}
