//! `pantry-core`: shared building blocks for the household inventory.
//!
//! This crate contains **pure domain** primitives (no IO, no async).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ItemId, RequestId};
