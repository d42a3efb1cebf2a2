// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle-keyed sub-allocation of byte regions inside a fixed arena.
//!
//! The allocator maintains a bijection from entry handles to disjoint
//! `[offset, offset + len)` regions of `[0, capacity)`. Live regions are
//! kept ordered by offset; free space is the set of gaps between them, so
//! deallocation merges free ranges implicitly. Placement is first-fit.

/// One live region, keyed by the caller-supplied handle.
#[derive(Debug, Clone, Copy)]
struct Region {
    handle: usize,
    offset: usize,
    len: usize,
}

/// First-fit region allocator over a fixed byte capacity.
///
/// Handles are caller-supplied slot indices; each handle owns at most one
/// region at a time. Reallocation is expressed as deallocate-then-allocate
/// by the caller, which lets a grown region reclaim its own old space.
#[derive(Debug)]
pub struct IndexAllocator {
    capacity: usize,
    max_handles: usize,
    /// Live regions ordered by offset. Disjointness is a structural
    /// invariant: each region starts at or after the end of its predecessor.
    regions: Vec<Region>,
}

impl IndexAllocator {
    /// Create an allocator over `[0, capacity)` accepting handles below
    /// `max_handles`.
    pub fn new(capacity: usize, max_handles: usize) -> Self {
        Self {
            capacity,
            max_handles,
            regions: Vec::new(),
        }
    }

    /// Allocate `size` bytes for `handle`, returning the placed offset.
    ///
    /// Returns `None` when no gap (including the tail) fits the request or
    /// the handle is out of range. The handle must not currently own a
    /// region; callers resize by deallocating first.
    pub fn allocate(&mut self, handle: usize, size: usize) -> Option<usize> {
        if handle >= self.max_handles || size == 0 || size > self.capacity {
            return None;
        }
        debug_assert!(
            self.find_region(handle).is_none(),
            "handle {} already owns a region",
            handle
        );

        let mut prev_end = 0usize;
        let mut insert_at = self.regions.len();
        for (i, region) in self.regions.iter().enumerate() {
            if region.offset - prev_end >= size {
                insert_at = i;
                break;
            }
            prev_end = region.offset + region.len;
        }
        if insert_at == self.regions.len() && self.capacity - prev_end < size {
            return None;
        }

        self.regions.insert(
            insert_at,
            Region {
                handle,
                offset: prev_end,
                len: size,
            },
        );
        Some(prev_end)
    }

    /// Release the region owned by `handle`.
    ///
    /// A handle with no live region is a no-op; returns whether a region
    /// was actually released.
    pub fn deallocate(&mut self, handle: usize) -> bool {
        match self.find_region(handle) {
            Some(index) => {
                self.regions.remove(index);
                true
            }
            None => false,
        }
    }

    /// Smallest offset `R` such that every live region lies in `[0, R)`.
    pub fn range(&self) -> usize {
        self.regions
            .last()
            .map_or(0, |region| region.offset + region.len)
    }

    /// Number of live regions.
    pub fn live_count(&self) -> usize {
        self.regions.len()
    }

    /// Return to the empty state; all handles become invalid.
    pub fn reset(&mut self) {
        self.regions.clear();
    }

    fn find_region(&self, handle: usize) -> Option<usize> {
        self.regions.iter().position(|region| region.handle == handle)
    }
}
