//! The shape-and-data object shared between tensor handles.

use smallvec::SmallVec;

use super::block::BlockKey;
use super::block_offsets::{BlockEntry, BlockOffsets};
use super::enumerate::for_each_conserved;
use crate::arena::ScratchArena;
use crate::edge::Edge;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;

/// Edges plus every conserved block, stored in one contiguous buffer.
///
/// Blocks are laid out back to back in key order; inside a block, data is
/// row-major over the axes. The block structure is fixed at construction,
/// only element values may change afterwards.
///
/// # Example
///
/// ```
/// use symtensor::{Edge, Z2};
/// use symtensor::arena::ScratchArena;
/// use symtensor::storage::blocksparse::Core;
///
/// let edge = Edge::new([(Z2(false), 2), (Z2(true), 3)]).unwrap();
/// let core: Core<f64, Z2> = Core::new(vec![edge.clone(), edge], &ScratchArena::new());
///
/// assert_eq!(core.blocks().nnzblocks(), 2);
/// assert_eq!(core.data().len(), 4 + 9);
/// ```
#[derive(Clone, Debug)]
pub struct Core<T, S: Symmetry> {
    edges: Vec<Edge<S>>,
    blocks: BlockOffsets<S>,
    data: Vec<T>,
}

impl<T: Scalar, S: Symmetry> Core<T, S> {
    /// Enumerate the conserved blocks of `edges` and allocate them zeroed.
    ///
    /// Segments that appear in no block are removed from their edge.
    pub fn new(mut edges: Vec<Edge<S>>, arena: &ScratchArena) -> Self {
        let rank = edges.len();
        let mut used = arena.vec_with_capacity(rank);
        for edge in &edges {
            used.push(arena.alloc_filled(edge.segments().len(), false));
        }

        let mut sizes = Vec::new();
        for_each_conserved(&edges, arena, |positions| {
            let mut size = 1;
            let key = BlockKey::collect_from(positions.iter().enumerate().map(|(axis, &p)| {
                used[axis][p] = true;
                let (symmetry, dim) = edges[axis].segments()[p];
                size *= dim;
                symmetry
            }));
            sizes.push((key, size));
        });

        for (edge, used) in edges.iter_mut().zip(used.iter()) {
            edge.retain_segments(|i, _| used[i]);
        }

        let blocks = BlockOffsets::from_sizes(sizes);
        tracing::trace!(
            rank,
            blocks = blocks.nnzblocks(),
            elements = blocks.total_len(),
            "constructed core"
        );
        let data = vec![T::zero(); blocks.total_len()];
        Self {
            edges,
            blocks,
            data,
        }
    }
}

impl<T, S: Symmetry> Core<T, S> {
    pub(crate) fn from_parts(edges: Vec<Edge<S>>, blocks: BlockOffsets<S>, data: Vec<T>) -> Self {
        debug_assert_eq!(blocks.total_len(), data.len());
        Self {
            edges,
            blocks,
            data,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<Edge<S>>, BlockOffsets<S>, Vec<T>) {
        (self.edges, self.blocks, self.data)
    }

    /// Number of axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.edges.len()
    }

    /// All edges, in axis order.
    #[inline]
    pub fn edges(&self) -> &[Edge<S>] {
        &self.edges
    }

    /// The edge of axis `axis`.
    #[inline]
    pub fn edge(&self, axis: usize) -> &Edge<S> {
        &self.edges[axis]
    }

    /// Block table.
    #[inline]
    pub fn blocks(&self) -> &BlockOffsets<S> {
        &self.blocks
    }

    /// The bulk buffer holding every block.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable bulk buffer.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Data of the block with the given key.
    pub fn block(&self, symmetries: &[S]) -> Option<&[T]> {
        let entry = self.blocks.get(symmetries)?;
        Some(&self.data[entry.offset..entry.offset + entry.len])
    }

    /// Mutable data of the block with the given key.
    pub fn block_mut(&mut self, symmetries: &[S]) -> Option<&mut [T]> {
        let entry = self.blocks.get(symmetries)?;
        let (offset, len) = (entry.offset, entry.len);
        Some(&mut self.data[offset..offset + len])
    }

    /// Per-axis dimensions of a block.
    pub fn block_shape(&self, symmetries: &[S]) -> Option<SmallVec<[usize; 8]>> {
        symmetries
            .iter()
            .zip(&self.edges)
            .map(|(&s, edge)| edge.dimension_of(s))
            .collect()
    }

    /// Iterate over `(entry, data)` for every block.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (&BlockEntry<S>, &[T])> {
        self.blocks
            .iter()
            .map(move |e| (e, &self.data[e.offset..e.offset + e.len]))
    }

    /// Same structure, values mapped elementwise.
    pub fn map_data<U>(&self, f: impl FnMut(&T) -> U) -> Core<U, S> {
        Core {
            edges: self.edges.clone(),
            blocks: self.blocks.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{FermiU1, NoSymmetry, U1, Z2};

    fn core<S: Symmetry>(edges: Vec<Edge<S>>) -> Core<f64, S> {
        Core::new(edges, &ScratchArena::new())
    }

    #[test]
    fn test_z2_two_blocks() {
        let edge = Edge::new([(Z2(false), 2), (Z2(true), 3)]).unwrap();
        let c = core(vec![edge.clone(), edge]);
        assert_eq!(c.blocks().nnzblocks(), 2);
        assert_eq!(c.block(&[Z2(false), Z2(false)]).unwrap().len(), 4);
        assert_eq!(c.block(&[Z2(true), Z2(true)]).unwrap().len(), 9);
        assert!(c.block(&[Z2(false), Z2(true)]).is_none());
    }

    #[test]
    fn test_pruning_removes_dangling_segments() {
        let a = Edge::new([(U1(0), 2), (U1(1), 3), (U1(5), 4)]).unwrap();
        let b = Edge::new([(U1(0), 1), (U1(-1), 2)]).unwrap();
        let c = core(vec![a, b]);
        assert_eq!(c.edge(0).segments(), &[(U1(0), 2), (U1(1), 3)]);
        assert_eq!(c.edge(1).segments(), &[(U1(-1), 2), (U1(0), 1)]);
        assert_eq!(c.data().len(), 2 + 6);
    }

    #[test]
    fn test_rank_zero_has_one_element() {
        let c = core::<NoSymmetry>(vec![]);
        assert_eq!(c.blocks().nnzblocks(), 1);
        assert_eq!(c.data(), &[0.0]);
    }

    #[test]
    fn test_empty_edge_has_no_blocks() {
        let a = Edge::new([(U1(0), 2)]).unwrap();
        let b = Edge::<U1>::new([]).unwrap();
        let c = core(vec![a, b]);
        assert!(c.blocks().is_empty());
        assert!(c.edge(0).segments().is_empty());
    }

    #[test]
    fn test_fermi_arrow_block_keys() {
        let out = Edge::new([(FermiU1(0), 1), (FermiU1(1), 2)]).unwrap();
        let c = core(vec![out.clone(), out.with_arrow(true)]);
        assert_eq!(c.blocks().nnzblocks(), 2);
        assert_eq!(c.block_shape(&[FermiU1(1), FermiU1(1)]).unwrap().as_slice(), &[2, 2]);
    }
}
