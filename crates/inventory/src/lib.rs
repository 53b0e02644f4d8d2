//! Household inventory: perishable items, expiry classification and the
//! in-memory repository that owns them.
//!
//! Nothing here suspends or performs IO. The repository is safe to share
//! across threads and notifies subscribers synchronously on every mutation.

pub mod event;
pub mod expiry;
pub mod item;
pub mod repository;

pub use event::{ChangeKind, InventoryEvent, ItemsChanged};
pub use expiry::{ExpirySummary, Severity, Urgency, days_until, expiry_label, urgency_of};
pub use item::{InventoryItem, ItemDraft, SUGGESTED_CATEGORIES};
pub use repository::InventoryRepository;
