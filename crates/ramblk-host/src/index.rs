//! Smallest-free index allocation.
//!
//! The host layer assigns each published disk a minor index. Indexes are
//! reused: freeing an index makes it the preferred candidate for the next
//! allocation, so the allocator always returns the smallest index not
//! currently live.

use std::collections::BTreeSet;

/// Allocates small integer ids, always returning the smallest free one.
#[derive(Debug)]
pub struct IndexAllocator {
    /// Indexes handed out and not yet freed.
    live: BTreeSet<u32>,
    /// Freed indexes below `next`, available for reuse.
    free: BTreeSet<u32>,
    /// Lowest index never handed out.
    next: u32,
    /// Exclusive upper bound on allocatable indexes.
    limit: u32,
}

impl IndexAllocator {
    /// Creates an allocator for indexes in `[0, limit)`.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            live: BTreeSet::new(),
            free: BTreeSet::new(),
            next: 0,
            limit,
        }
    }

    /// Allocates the smallest free index, or `None` if the range is
    /// exhausted.
    pub fn alloc(&mut self) -> Option<u32> {
        let idx = match self.free.pop_first() {
            Some(idx) => idx,
            None => {
                if self.next >= self.limit {
                    return None;
                }
                let idx = self.next;
                self.next += 1;
                idx
            }
        };
        self.live.insert(idx);
        Some(idx)
    }

    /// Returns `idx` to the allocator. Freeing an index that is not live is
    /// ignored.
    pub fn free(&mut self, idx: u32) {
        if self.live.remove(&idx) {
            self.free.insert(idx);
        }
    }

    /// Returns `true` if `idx` is currently allocated.
    #[must_use]
    pub fn is_live(&self, idx: u32) -> bool {
        self.live.contains(&idx)
    }

    /// Number of currently allocated indexes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
