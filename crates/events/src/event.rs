use chrono::{DateTime, Utc};

/// A domain-agnostic change event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **self-contained** (carry the state they describe, not a reference to it)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.items.changed").
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
