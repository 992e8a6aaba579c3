//! Entity identifiers and id generation.
//!
//! An [`EntityId`] is a lightweight `u64` identifier. Ids are produced by an
//! explicitly constructed [`IdGenerator`]; there is no process-wide default
//! generator, so every test or host owns the generator it hands out ids from.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// The id is assigned when the entity is constructed and never changes. It is
/// never reused while the entity is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an id from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A source of unique entity identifiers.
///
/// Implementations must never return the same id twice for the lifetime of
/// the generator.
pub trait IdGenerator {
    /// Returns a fresh identifier.
    fn next_id(&mut self) -> EntityId;
}

/// Allocates monotonically increasing entity ids.
///
/// Create one per process (or per test) and pass it to every entity
/// construction site.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. Ids start at 1 (0 is reserved for [`EntityId::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh entity id.
    pub fn allocate(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        EntityId(id)
    }

    /// Returns the number of ids allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for EntityAllocator {
    fn next_id(&mut self) -> EntityId {
        self.allocate()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Hands out only even ids, to exercise code written against the trait.
    struct Evens(u64);

    impl IdGenerator for Evens {
        fn next_id(&mut self) -> EntityId {
            self.0 += 2;
            EntityId(self.0)
        }
    }

    fn draw(ids: &mut impl IdGenerator, n: usize) -> Vec<EntityId> {
        (0..n).map(|_| ids.next_id()).collect()
    }

    #[test]
    fn test_allocator_never_hands_out_invalid() {
        let mut alloc = EntityAllocator::new();
        let drawn = draw(&mut alloc, 1_000);

        assert!(drawn.iter().all(|id| id.is_valid()));
        let unique: HashSet<_> = drawn.iter().copied().collect();
        assert_eq!(unique.len(), 1_000);
        assert_eq!(alloc.count(), 1_000);
    }

    #[test]
    fn test_allocation_order_matches_id_order() {
        let mut alloc = EntityAllocator::default();
        let drawn = draw(&mut alloc, 5);
        let mut sorted = drawn.clone();
        sorted.sort();
        assert_eq!(drawn, sorted);
        assert_eq!(drawn.first(), Some(&EntityId::from_raw(1)));
    }

    #[test]
    fn test_custom_generator_through_trait() {
        let mut evens = Evens(0);
        let drawn = draw(&mut evens, 3);
        assert_eq!(drawn, vec![EntityId(2), EntityId(4), EntityId(6)]);
        assert_eq!(drawn[2].to_string(), "Entity(6)");
    }

    #[test]
    fn test_id_serialises_as_bare_number() {
        let id = EntityId::from_raw(17);
        assert_eq!(serde_json::to_string(&id).unwrap(), "17");
        let back: EntityId = serde_json::from_str("17").unwrap();
        assert_eq!(back, id);
        let invalid: EntityId = serde_json::from_str("0").unwrap();
        assert!(!invalid.is_valid());
    }
}
