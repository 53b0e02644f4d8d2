//! Change events and synchronous in-process fan-out.

pub mod event;
pub mod notifier;

pub use event::Event;
pub use notifier::{ChangeNotifier, Delivery, HandlerError, HandlerResult, SubscriptionId};
