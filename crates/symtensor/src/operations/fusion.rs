//! Fusion tables: how several edges combine into one.
//!
//! Fusing edges `e_1 .. e_k` produces one edge whose segment `m` is the
//! concatenation of every sub-block `(s_1, .., s_k)` with `s_1 + .. + s_k = m`.
//! The same table drives both merge (sub-blocks into `m`) and split (`m` back
//! into sub-blocks).

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::edge::Edge;
use crate::symmetry::Symmetry;

/// One sub-block of a fused segment.
#[derive(Debug, Clone)]
pub(crate) struct FusionEntry<S: Symmetry> {
    pub subs: SmallVec<[S; 8]>,
    pub merged: S,
    /// Start of this sub-block inside the fused segment.
    pub offset: usize,
    pub dims: SmallVec<[usize; 8]>,
}

impl<S: Symmetry> FusionEntry<S> {
    /// Row-major strides of the sub-block dimensions.
    pub fn inner_strides(&self) -> SmallVec<[usize; 8]> {
        let mut strides: SmallVec<[usize; 8]> = SmallVec::from_elem(0, self.dims.len());
        let mut stride = 1;
        for (s, &d) in strides.iter_mut().zip(&self.dims).rev() {
            *s = stride;
            stride *= d;
        }
        strides
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FusionTable<S: Symmetry> {
    /// Sorted by `subs`.
    entries: Vec<FusionEntry<S>>,
    merged: Vec<(S, usize)>,
}

impl<S: Symmetry> FusionTable<S> {
    /// Fuse `edges` in order.
    ///
    /// Sub-blocks are laid out in lexicographic order of their segment
    /// positions. With `reversed_order`, each edge's segments are walked from
    /// last to first instead; a group of negated values then lines up with
    /// the group it cancels.
    pub fn new(edges: &[Edge<S>], reversed_order: bool) -> Self {
        let rank = edges.len();
        let mut entries = Vec::new();
        let mut running: BTreeMap<S, usize> = BTreeMap::new();
        if edges.iter().any(|e| e.segments().is_empty()) {
            return Self {
                entries,
                merged: Vec::new(),
            };
        }

        let mut positions: SmallVec<[usize; 8]> = SmallVec::from_elem(0, rank);
        loop {
            let mut merged = S::default();
            let mut subs = SmallVec::new();
            let mut dims = SmallVec::new();
            for (edge, &p) in edges.iter().zip(&positions) {
                let segments = edge.segments();
                let index = if reversed_order { segments.len() - 1 - p } else { p };
                let (symmetry, dim) = segments[index];
                merged = merged + symmetry;
                subs.push(symmetry);
                dims.push(dim);
            }
            let size: usize = dims.iter().product();
            let offset = running.entry(merged).or_insert(0);
            entries.push(FusionEntry {
                subs,
                merged,
                offset: *offset,
                dims,
            });
            *offset += size;

            let mut axis = rank;
            loop {
                if axis == 0 {
                    entries.sort_by(|a, b| a.subs.cmp(&b.subs));
                    return Self {
                        entries,
                        merged: running.into_iter().collect(),
                    };
                }
                axis -= 1;
                positions[axis] += 1;
                if positions[axis] < edges[axis].segments().len() {
                    break;
                }
                positions[axis] = 0;
            }
        }
    }

    /// Segments of the fused edge, sorted.
    pub fn merged_segments(&self) -> &[(S, usize)] {
        &self.merged
    }

    /// Dimension of fused segment `merged`.
    pub fn dimension_of(&self, merged: S) -> Option<usize> {
        self.merged
            .binary_search_by(|(s, _)| s.cmp(&merged))
            .ok()
            .map(|i| self.merged[i].1)
    }

    /// The sub-block with the given sub-edge values.
    pub fn find(&self, subs: &[S]) -> Option<&FusionEntry<S>> {
        self.entries
            .binary_search_by(|e| e.subs.as_slice().cmp(subs))
            .ok()
            .map(|i| &self.entries[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{NoSymmetry, U1};

    #[test]
    fn test_u1_fusion_offsets() {
        let a = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
        let b = Edge::new([(U1(0), 3), (U1(1), 1)]).unwrap();
        let table = FusionTable::new(&[a, b], false);
        assert_eq!(table.merged_segments(), &[(U1(0), 3), (U1(1), 7), (U1(2), 2)]);
        // (0,1) comes before (1,0) inside segment 1
        assert_eq!(table.find(&[U1(0), U1(1)]).unwrap().offset, 0);
        assert_eq!(table.find(&[U1(1), U1(0)]).unwrap().offset, 1);
        assert_eq!(table.find(&[U1(1), U1(0)]).unwrap().dims.as_slice(), &[2, 3]);
    }

    #[test]
    fn test_reversed_order_aligns_negated_group() {
        let a = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
        let b = Edge::new([(U1(0), 3), (U1(1), 1)]).unwrap();
        let forward = FusionTable::new(&[a.clone(), b.clone()], false);
        let backward = FusionTable::new(&[a.conjugated(), b.conjugated()], true);
        for (x, y) in [(0, 1), (1, 0)] {
            let f = forward.find(&[U1(x), U1(y)]).unwrap();
            let g = backward.find(&[U1(-x), U1(-y)]).unwrap();
            assert_eq!(f.offset, g.offset);
        }
    }

    #[test]
    fn test_empty_group_is_unit() {
        let table = FusionTable::<NoSymmetry>::new(&[], false);
        assert_eq!(table.merged_segments(), &[(NoSymmetry, 1)]);
        assert_eq!(table.find(&[]).unwrap().offset, 0);
    }

    #[test]
    fn test_inner_strides() {
        let a = Edge::<NoSymmetry>::trivial(2);
        let b = Edge::<NoSymmetry>::trivial(3);
        let c = Edge::<NoSymmetry>::trivial(4);
        let table = FusionTable::new(&[a, b, c], false);
        let entry = table.find(&[NoSymmetry; 3]).unwrap();
        assert_eq!(entry.inner_strides().as_slice(), &[12, 4, 1]);
    }
}
