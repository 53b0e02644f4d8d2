//! Synchronous publish/subscribe for state-change notifications.
//!
//! `ChangeNotifier` is the in-process fan-out used by stateful components to
//! tell interested parties that something changed. Unlike a message bus it does
//! **no queuing**: a publish is delivered to the handlers registered at that
//! moment, on the publishing thread, before `publish` returns.
//!
//! ## Delivery Guarantees
//!
//! - Handlers run **synchronously**, in subscription order.
//! - The handler list is **snapshotted** before dispatch, so a handler may
//!   subscribe or unsubscribe (itself or others) without disturbing the
//!   delivery in progress. Changes take effect from the next publish.
//! - A failing handler (returned `Err` or panicked) is **isolated**: the
//!   failure is logged and delivery continues with the next handler.
//! - A handler registered after a publish never observes that publish.
//!
//! ## Ownership
//!
//! Whoever calls `subscribe` owns the returned `SubscriptionId` and must call
//! `unsubscribe` before discarding it; otherwise the handler (and anything it
//! captures) lives as long as the notifier.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::Event;

/// Error type a fallible handler may return.
pub type HandlerError = anyhow::Error;

/// Result of a fallible handler.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<M> = Arc<dyn Fn(&M) -> HandlerResult + Send + Sync>;

/// Handle identifying one registered handler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of a single `publish`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Handlers that returned normally with `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
}

impl Delivery {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// In-process synchronous fan-out.
pub struct ChangeNotifier<M> {
    handlers: Mutex<Vec<(SubscriptionId, Handler<M>)>>,
    next_id: AtomicU64,
}

impl<M> ChangeNotifier<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Register an infallible handler.
    ///
    /// A panic inside `handler` is caught and counted as a failed delivery.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        self.try_subscribe(move |message| {
            handler(message);
            Ok(())
        })
    }

    /// Register a handler that can report failure.
    pub fn try_subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&M) -> HandlerResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(handler)));
        id
    }

    /// Deregister a handler. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() != before
    }

    fn snapshot(&self) -> Vec<(SubscriptionId, Handler<M>)> {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, h)| (*id, Arc::clone(h)))
            .collect()
    }
}

impl<M: Event> ChangeNotifier<M> {
    /// Deliver `message` to every handler registered right now.
    ///
    /// Never fails: handler failures are logged and tallied in the returned
    /// `Delivery`.
    pub fn publish(&self, message: &M) -> Delivery {
        // The lock is released before any handler runs.
        let handlers = self.snapshot();
        let mut delivery = Delivery::default();

        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(err)) => {
                    delivery.failed += 1;
                    warn!(
                        subscription = %id,
                        event_type = message.event_type(),
                        error = %err,
                        "subscriber failed"
                    );
                }
                Err(_) => {
                    delivery.failed += 1;
                    warn!(
                        subscription = %id,
                        event_type = message.event_type(),
                        "subscriber panicked"
                    );
                }
            }
        }

        delivery
    }
}

impl<M> Default for ChangeNotifier<M> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<M> core::fmt::Debug for ChangeNotifier<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
