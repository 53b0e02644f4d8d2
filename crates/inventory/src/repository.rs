//! In-memory inventory repository.
//!
//! The repository exclusively owns the item collection. Callers only ever see
//! copies: `get_items` returns a fresh `Vec`, and every `ItemsChanged` event
//! carries its own snapshot.
//!
//! ## Single-writer discipline
//!
//! Mutations are serialized by a write gate held across
//! *assign id → append/remove → snapshot → publish*. Two consequences:
//!
//! - subscribers observe mutations in exactly the order they were invoked,
//!   and each snapshot reflects precisely the state after its own mutation;
//! - when `add_item`/`remove_item` returns, every subscriber has already been
//!   notified.
//!
//! Reads (`get_items`, `get_item`, `summary`) only take the short-lived state
//! lock, so a subscriber may read the repository while being notified. A
//! subscriber must not *mutate* the repository from inside its handler; doing
//! so on the dispatching thread is rejected with `DomainError::Conflict`
//! instead of deadlocking.

use std::sync::{Mutex, RwLock};
use std::thread::{self, ThreadId};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use pantry_core::{Clock, DomainError, DomainResult, Entity, ItemId, SystemClock};
use pantry_events::{ChangeNotifier, HandlerResult, SubscriptionId};

use crate::event::{ChangeKind, InventoryEvent, ItemsChanged};
use crate::expiry::ExpirySummary;
use crate::item::{InventoryItem, ItemDraft};

pub struct InventoryRepository<C: Clock = SystemClock> {
    items: RwLock<Vec<InventoryItem>>,
    write_gate: Mutex<()>,
    dispatching: Mutex<Option<ThreadId>>,
    notifier: ChangeNotifier<InventoryEvent>,
    clock: C,
}

impl InventoryRepository<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InventoryRepository<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InventoryRepository<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            write_gate: Mutex::new(()),
            dispatching: Mutex::new(None),
            notifier: ChangeNotifier::new(),
            clock,
        }
    }

    /// Validate `draft`, assign identity and creation time, append, notify.
    pub fn add_item(&self, draft: ItemDraft) -> DomainResult<InventoryItem> {
        draft.validate()?;
        self.ensure_not_dispatching()?;
        let _gate = self.write_gate.lock().unwrap_or_else(|e| e.into_inner());

        let now = self.clock.now();
        let (item, snapshot) = {
            let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
            let id = fresh_id(&items);
            let item = InventoryItem::from_draft(id, draft, now);
            items.push(item.clone());
            (item, items.clone())
        };

        info!(item_id = %item.id(), name = item.name(), category = item.category(), "item added");
        self.dispatch(InventoryEvent::ItemsChanged(ItemsChanged {
            kind: ChangeKind::Added(item.id_typed()),
            items: snapshot,
            occurred_at: now,
        }));

        Ok(item)
    }

    /// Remove the item with `id`, returning it.
    ///
    /// Removing an absent id is a no-op: it returns `Ok(None)` and publishes
    /// nothing.
    pub fn remove_item(&self, id: ItemId) -> DomainResult<Option<InventoryItem>> {
        self.ensure_not_dispatching()?;
        let _gate = self.write_gate.lock().unwrap_or_else(|e| e.into_inner());

        let (removed, snapshot) = {
            let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
            let Some(pos) = items.iter().position(|item| item.id_typed() == id) else {
                debug!(item_id = %id, "remove of absent item ignored");
                return Ok(None);
            };
            let removed = items.remove(pos);
            (removed, items.clone())
        };

        info!(item_id = %id, name = removed.name(), "item removed");
        self.dispatch(InventoryEvent::ItemsChanged(ItemsChanged {
            kind: ChangeKind::Removed(id),
            items: snapshot,
            occurred_at: self.clock.now(),
        }));

        Ok(Some(removed))
    }

    /// Independent copy of all items in insertion order.
    pub fn get_items(&self) -> Vec<InventoryItem> {
        self.items.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get_item(&self, id: ItemId) -> Option<InventoryItem> {
        self.items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|item| item.id_typed() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expiry bucket counts at `now`.
    pub fn summary(&self, now: NaiveDateTime) -> ExpirySummary {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        ExpirySummary::from_items(items.iter(), now)
    }

    /// Receive the full item list after every mutation.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&[InventoryItem]) + Send + Sync + 'static,
    {
        self.notifier.subscribe(move |event: &InventoryEvent| handler(event.items()))
    }

    /// Receive every change event, reporting handler failures.
    pub fn subscribe_events<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&InventoryEvent) -> HandlerResult + Send + Sync + 'static,
    {
        self.notifier.try_subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    fn ensure_not_dispatching(&self) -> DomainResult<()> {
        let dispatching = self.dispatching.lock().unwrap_or_else(|e| e.into_inner());
        if *dispatching == Some(thread::current().id()) {
            return Err(DomainError::conflict(
                "inventory mutated from inside a change handler",
            ));
        }
        Ok(())
    }

    /// Publish while the write gate is held.
    fn dispatch(&self, event: InventoryEvent) {
        *self.dispatching.lock().unwrap_or_else(|e| e.into_inner()) = Some(thread::current().id());
        let delivery = self.notifier.publish(&event);
        *self.dispatching.lock().unwrap_or_else(|e| e.into_inner()) = None;

        debug!(
            delivered = delivery.delivered,
            failed = delivery.failed,
            items = event.items().len(),
            "change published"
        );
    }
}

/// A UUIDv7 not already present in `items`.
///
/// v7 ids are unique per process even within one millisecond; the membership
/// check makes the live-collection invariant hold regardless.
fn fresh_id(items: &[InventoryItem]) -> ItemId {
    loop {
        let id = ItemId::new();
        if !items.iter().any(|item| item.id_typed() == id) {
            return id;
        }
    }
}

impl<C: Clock> core::fmt::Debug for InventoryRepository<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryRepository")
            .field("items", &self.len())
            .field("notifier", &self.notifier)
            .finish()
    }
}
