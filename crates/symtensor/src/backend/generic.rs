//! Generic (naive loop-based) backend implementation.

use smallvec::SmallVec;

use crate::backend::permutation::{PermutationBackend, StridedMove};
use crate::scalar::Scalar;

/// Generic backend using naive loop-based implementations.
///
/// This backend is always available. The innermost axis is walked in a tight
/// loop; outer axes advance with an odometer.
pub struct GenericBackend;

impl PermutationBackend for GenericBackend {
    fn move_block<ElT: Scalar>(dst: &mut [ElT], src: &[ElT], plan: &StridedMove<'_>, negate: bool) {
        let rank = plan.dims.len();
        if plan.dims.contains(&0) {
            return;
        }
        if rank == 0 {
            let value = src[plan.src_offset];
            dst[plan.dst_offset] = if negate { -value } else { value };
            return;
        }

        let last = rank - 1;
        let inner = plan.dims[last];
        let inner_src = plan.src_strides[last];
        let inner_dst = plan.dst_strides[last];
        let mut index: SmallVec<[usize; 8]> = SmallVec::from_elem(0, last);
        let mut src_base = plan.src_offset;
        let mut dst_base = plan.dst_offset;

        loop {
            let (mut s, mut d) = (src_base, dst_base);
            if negate {
                for _ in 0..inner {
                    dst[d] = -src[s];
                    s += inner_src;
                    d += inner_dst;
                }
            } else {
                for _ in 0..inner {
                    dst[d] = src[s];
                    s += inner_src;
                    d += inner_dst;
                }
            }

            // advance the outer odometer
            let mut axis = last;
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                index[axis] += 1;
                src_base += plan.src_strides[axis];
                dst_base += plan.dst_strides[axis];
                if index[axis] < plan.dims[axis] {
                    break;
                }
                src_base -= plan.src_strides[axis] * plan.dims[axis];
                dst_base -= plan.dst_strides[axis] * plan.dims[axis];
                index[axis] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_2x3() {
        let src: Vec<f64> = (0..6).map(|x| x as f64).collect();
        let mut dst = vec![0.0; 6];
        // walk src as (i, j) with dst laid out as (j, i)
        let plan = StridedMove {
            dims: &[2, 3],
            src_strides: &[3, 1],
            dst_strides: &[1, 2],
            src_offset: 0,
            dst_offset: 0,
        };
        GenericBackend::move_block(&mut dst, &src, &plan, false);
        assert_eq!(dst, vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_offsets_and_negation() {
        let src = vec![9.0, 1.0, 2.0];
        let mut dst = vec![0.0; 4];
        let plan = StridedMove {
            dims: &[2],
            src_strides: &[1],
            dst_strides: &[2],
            src_offset: 1,
            dst_offset: 1,
        };
        GenericBackend::move_block(&mut dst, &src, &plan, true);
        assert_eq!(dst, vec![0.0, -1.0, 0.0, -2.0]);
    }

    #[test]
    fn test_rank_zero_and_empty() {
        let src = vec![5.0];
        let mut dst = vec![0.0];
        let plan = StridedMove {
            dims: &[],
            src_strides: &[],
            dst_strides: &[],
            src_offset: 0,
            dst_offset: 0,
        };
        GenericBackend::move_block(&mut dst, &src, &plan, false);
        assert_eq!(dst, vec![5.0]);

        let plan = StridedMove {
            dims: &[0, 3],
            src_strides: &[3, 1],
            dst_strides: &[3, 1],
            src_offset: 0,
            dst_offset: 0,
        };
        GenericBackend::move_block(&mut dst, &src, &plan, false);
        assert_eq!(dst, vec![5.0]);
    }

    #[test]
    fn test_3d_permutation() {
        // src shape (2, 3, 4), dst shape (4, 2, 3)
        let src: Vec<f64> = (0..24).map(|x| x as f64).collect();
        let mut dst = vec![0.0; 24];
        let plan = StridedMove {
            dims: &[2, 3, 4],
            src_strides: &[12, 4, 1],
            dst_strides: &[3, 1, 6],
            src_offset: 0,
            dst_offset: 0,
        };
        GenericBackend::move_block(&mut dst, &src, &plan, false);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(dst[k * 6 + i * 3 + j], src[i * 12 + j * 4 + k]);
                }
            }
        }
    }
}
