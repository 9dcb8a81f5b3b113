//! Entity trait: identity + a human label for pickers and notices.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Short human-readable label (e.g. `"Beras (BRS-01)"`).
    fn label(&self) -> String;
}
