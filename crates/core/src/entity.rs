//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stores key their tables by `Entity::id`, so every persisted access-control
/// record implements it.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
