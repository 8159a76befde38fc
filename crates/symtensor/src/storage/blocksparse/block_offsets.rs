//! BlockOffsets for mapping block keys to storage offsets.
//!
//! Blocks are kept sorted by key, so lookup is a binary search and iteration
//! follows the storage order.

use super::block::BlockKey;
use crate::symmetry::Symmetry;

/// One stored block: its key, where it starts, and how many elements it has.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockEntry<S: Symmetry> {
    pub key: BlockKey<S>,
    pub offset: usize,
    pub len: usize,
}

/// Maps block keys to their offsets in flat storage.
///
/// # Example
/// ```
/// use symtensor::Z2;
/// use symtensor::storage::blocksparse::{BlockKey, BlockOffsets};
///
/// let offsets = BlockOffsets::from_sizes(vec![
///     (BlockKey::new(&[Z2(false), Z2(false)]), 4),
///     (BlockKey::new(&[Z2(true), Z2(true)]), 9),
/// ]);
///
/// assert_eq!(offsets.nnzblocks(), 2);
/// assert_eq!(offsets.get(&[Z2(true), Z2(true)]).map(|e| e.offset), Some(4));
/// assert_eq!(offsets.total_len(), 13);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockOffsets<S: Symmetry> {
    entries: Vec<BlockEntry<S>>,
    total_len: usize,
}

impl<S: Symmetry> BlockOffsets<S> {
    /// Create BlockOffsets from `(key, size)` pairs.
    ///
    /// Keys are sorted, offsets are assigned sequentially in key order.
    pub fn from_sizes(mut sizes: Vec<(BlockKey<S>, usize)>) -> Self {
        sizes.sort_by(|a, b| a.0.cmp(&b.0));
        let mut entries = Vec::with_capacity(sizes.len());
        let mut current_offset = 0;
        for (key, len) in sizes {
            entries.push(BlockEntry {
                key,
                offset: current_offset,
                len,
            });
            current_offset += len;
        }
        Self {
            entries,
            total_len: current_offset,
        }
    }

    /// Look up a block by its symmetries.
    #[inline]
    pub fn get(&self, symmetries: &[S]) -> Option<&BlockEntry<S>> {
        self.position(symmetries).map(|i| &self.entries[i])
    }

    /// Position of a block in storage order.
    #[inline]
    pub fn position(&self, symmetries: &[S]) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.key.symmetries().cmp(symmetries))
            .ok()
    }

    /// Check if a block is present.
    #[inline]
    pub fn contains(&self, symmetries: &[S]) -> bool {
        self.position(symmetries).is_some()
    }

    /// Get the number of stored blocks.
    #[inline]
    pub fn nnzblocks(&self) -> usize {
        self.entries.len()
    }

    /// Get the total number of stored elements.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Check if there are no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over blocks in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, BlockEntry<S>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::U1;

    #[test]
    fn test_offsets_follow_sorted_keys() {
        let offsets = BlockOffsets::from_sizes(vec![
            (BlockKey::new(&[U1(1), U1(-1)]), 6),
            (BlockKey::new(&[U1(0), U1(0)]), 2),
        ]);
        let first = offsets.iter().next().unwrap();
        assert_eq!(first.key.symmetries(), &[U1(0), U1(0)]);
        assert_eq!(first.offset, 0);
        assert_eq!(offsets.get(&[U1(1), U1(-1)]).unwrap().offset, 2);
        assert_eq!(offsets.total_len(), 8);
    }

    #[test]
    fn test_missing_block() {
        let offsets = BlockOffsets::from_sizes(vec![(BlockKey::new(&[U1(0)]), 3)]);
        assert!(!offsets.contains(&[U1(1)]));
        assert!(offsets.get(&[U1(1)]).is_none());
    }

    #[test]
    fn test_empty() {
        let offsets = BlockOffsets::<U1>::from_sizes(Vec::new());
        assert!(offsets.is_empty());
        assert_eq!(offsets.total_len(), 0);
    }
}
