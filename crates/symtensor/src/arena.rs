//! Scratch arena for short-lived tables built by tensor operations.
//!
//! Every top-level operation creates one [`ScratchArena`], hands `&ScratchArena`
//! to the helpers it calls, and drops it when it returns. All scratch memory
//! is released at once on every exit path, including `?` propagation.

use std::cell::Cell;

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;

/// Bytes reserved per axis by [`ScratchArena::for_rank`].
pub const ARENA_BYTES_PER_AXIS: usize = 256;

/// A bump allocator scoped to one tensor operation.
#[derive(Debug)]
pub struct ScratchArena {
    bump: Bump,
    bytes_allocated: Cell<usize>,
}

impl ScratchArena {
    /// Create an empty arena; nothing is reserved until the first allocation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bump: Bump::new(),
            bytes_allocated: Cell::new(0),
        }
    }

    /// Create an arena sized for the tables of an operation on `rank` axes.
    #[must_use]
    pub fn for_rank(rank: usize) -> Self {
        Self::with_capacity(rank * ARENA_BYTES_PER_AXIS)
    }

    /// Create an arena with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
            bytes_allocated: Cell::new(0),
        }
    }

    /// Allocate a slice filled with copies of `value`.
    pub fn alloc_filled<T: Copy>(&self, len: usize, value: T) -> &mut [T] {
        self.record(len * std::mem::size_of::<T>());
        self.bump.alloc_slice_fill_copy(len, value)
    }

    /// A growable vector with room for `capacity` items.
    pub fn vec_with_capacity<T>(&self, capacity: usize) -> BumpVec<'_, T> {
        self.record(capacity * std::mem::size_of::<T>());
        BumpVec::with_capacity_in(capacity, &self.bump)
    }

    /// Bytes requested through the typed helpers.
    #[must_use]
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated.get()
    }

    /// Bytes held by the underlying chunks, including growth of arena vectors.
    #[must_use]
    pub fn allocated_bytes_including_metadata(&self) -> usize {
        self.bump.allocated_bytes()
    }

    fn record(&self, bytes: usize) {
        self.bytes_allocated.set(self.bytes_allocated.get() + bytes);
    }
}

impl Default for ScratchArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        tracing::trace!(
            bytes = self.bytes_allocated.get(),
            chunk_bytes = self.bump.allocated_bytes(),
            "releasing scratch arena"
        );
    }
}
