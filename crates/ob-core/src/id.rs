use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an obstacle in the store.
///
/// A plain `u64` newtype: `Copy`, `Eq`, `Hash` in O(1). Ids are assigned
/// monotonically by the store's [`IdAllocator`] and are never reused within
/// a store's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(u64);

impl ObstacleId {
    /// Wrap a raw id value. Test fixtures and deserialized snapshots use
    /// this; live code obtains ids from the allocator.
    pub const fn from_raw(n: u64) -> Self {
        ObstacleId(n)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source, owned by a store instance.
///
/// Store-scoped rather than global so isolated stores in tests produce
/// predictable ids starting from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        // Start at 1: id 0 is reserved as "never assigned".
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> ObstacleId {
        let id = ObstacleId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
