use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pantry_core::ItemId;
use pantry_events::Event;

use crate::item::InventoryItem;

/// What triggered an `ItemsChanged` event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added(ItemId),
    Removed(ItemId),
}

/// Event: ItemsChanged.
///
/// `items` is the complete collection immediately after the mutation, in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsChanged {
    pub kind: ChangeKind,
    pub items: Vec<InventoryItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemsChanged(ItemsChanged),
}

impl InventoryEvent {
    /// The post-mutation snapshot carried by this event.
    pub fn items(&self) -> &[InventoryItem] {
        match self {
            InventoryEvent::ItemsChanged(e) => &e.items,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            InventoryEvent::ItemsChanged(e) => e.kind,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemsChanged(_) => "inventory.items.changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemsChanged(e) => e.occurred_at,
        }
    }
}
