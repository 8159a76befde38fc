//! Strided block move trait.

use crate::scalar::Scalar;

/// One dense sub-block move between two row-major buffers.
///
/// The element at multi-index `i` (over `dims`) is read from
/// `src_offset + sum(i * src_strides)` and written to
/// `dst_offset + sum(i * dst_strides)`.
#[derive(Debug, Clone, Copy)]
pub struct StridedMove<'a> {
    pub dims: &'a [usize],
    pub src_strides: &'a [usize],
    pub dst_strides: &'a [usize],
    pub src_offset: usize,
    pub dst_offset: usize,
}

/// Backend trait for moving data between blocks.
///
/// Every axis transformation (transpose, split, merge) is reduced to a set of
/// independent strided moves, one per fine block.
pub trait PermutationBackend {
    /// Copy one strided sub-block, negating the values if `negate` is set.
    fn move_block<ElT: Scalar>(dst: &mut [ElT], src: &[ElT], plan: &StridedMove<'_>, negate: bool);
}
