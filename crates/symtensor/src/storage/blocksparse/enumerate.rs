//! Enumeration of conserved segment combinations.
//!
//! The odometer advances the last axis fastest. Partial charge sums of the
//! prefix axes are memoized, and only axes at or after the lowest index that
//! changed since the previous combination are re-accumulated.

use crate::arena::ScratchArena;
use crate::edge::Edge;
use crate::symmetry::Symmetry;

/// Call `visit` with the segment positions of every combination whose
/// charges sum to the identity, in lexicographic order of positions.
///
/// Rank 0 visits the empty combination once; any edge without segments
/// yields no combination at all.
pub(crate) fn for_each_conserved<S: Symmetry>(
    edges: &[Edge<S>],
    arena: &ScratchArena,
    mut visit: impl FnMut(&[usize]),
) {
    let rank = edges.len();
    if rank == 0 {
        visit(&[]);
        return;
    }
    if edges.iter().any(|e| e.segments().is_empty()) {
        return;
    }

    let positions = arena.alloc_filled(rank, 0usize);
    // prefix[i] is the charge sum of axes 0..i
    let prefix = arena.alloc_filled(rank + 1, S::default());
    let mut min_changed = 0;

    loop {
        for axis in min_changed..rank {
            let (symmetry, _) = edges[axis].segments()[positions[axis]];
            prefix[axis + 1] = prefix[axis] + edges[axis].charge(symmetry);
        }
        if prefix[rank].is_identity() {
            visit(positions);
        }

        let mut axis = rank;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            positions[axis] += 1;
            if positions[axis] < edges[axis].segments().len() {
                break;
            }
            positions[axis] = 0;
        }
        min_changed = axis;
    }
}
