//! Program element identity.
//!
//! The cache never looks inside the program model. Everything it needs to
//! know about a reference, variable or expression is exposed through
//! [`ModelNode`]: which element owns it and whether that element is
//! physical (backed by persisted content) or transient.

use std::fmt;
use std::sync::Arc;

// =============================================================================
// ElementId
// =============================================================================

/// Identifier of an element in the program model.
///
/// Used as the recursion-guard key: two distinct reference objects owned by
/// the same element share an `ElementId`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    /// Sentinel value for an invalid element.
    pub const INVALID: Self = Self(0);

    /// First valid `ElementId`.
    pub const FIRST_VALID: u32 = 1;

    /// Check if this `ElementId` is valid.
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::FIRST_VALID
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// ModelNode
// =============================================================================

/// A node handed to the cache by the program model.
///
/// Implemented by references (whose anchor is the owning element), by
/// variables and by expressions (whose anchor is usually themselves).
pub trait ModelNode: Send + Sync {
    /// The element that owns this node.
    fn anchor(&self) -> ElementId;

    /// Whether the anchor belongs to persisted content.
    ///
    /// Decides which partitions an entry lands in and therefore which
    /// invalidation events drop it.
    fn is_physical(&self) -> bool;
}

impl<T: ModelNode + ?Sized> ModelNode for Arc<T> {
    fn anchor(&self) -> ElementId {
        (**self).anchor()
    }

    fn is_physical(&self) -> bool {
        (**self).is_physical()
    }
}

impl<T: ModelNode + ?Sized> ModelNode for &T {
    fn anchor(&self) -> ElementId {
        (**self).anchor()
    }

    fn is_physical(&self) -> bool {
        (**self).is_physical()
    }
}

#[cfg(test)]
#[path = "../tests/element_tests.rs"]
mod tests;
