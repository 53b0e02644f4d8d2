//! Entity trait: identity + continuity across replacements.

/// Entity marker + minimal interface.
///
/// Entities are compared by identity. Two snapshots of the same item taken at
/// different times share an id even if every other attribute differs.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
