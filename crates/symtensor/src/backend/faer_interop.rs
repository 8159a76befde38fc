//! Row-major views onto faer matrices.
//!
//! Blocks are stored row-major while faer works column-major. A row-major
//! `r x c` buffer read as a column-major `c x r` matrix is the transpose, so
//! every helper here either views buffers transposed or copies element-wise.

use faer::linalg::matmul::matmul;
use faer::linalg::solvers::{Qr, Solve, Svd, SvdError};
use faer::{Accum, Mat, MatMut, MatRef, Par};

use crate::error::TensorError;
use crate::scalar::Scalar;

/// View a row-major `rows x cols` buffer as a faer matrix (zero-copy).
///
/// # Example
///
/// ```
/// use symtensor::backend::mat_from_row_major;
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let mat = mat_from_row_major(&data, 2, 3);
/// assert_eq!(mat[(0, 2)], 3.0);
/// assert_eq!(mat[(1, 0)], 4.0);
/// ```
pub fn mat_from_row_major<T: Scalar>(data: &[T], rows: usize, cols: usize) -> MatRef<'_, T> {
    MatRef::from_column_major_slice(data, cols, rows).transpose()
}

/// Copy a faer matrix into a row-major buffer.
pub fn write_row_major<T: Scalar>(dst: &mut [T], mat: MatRef<'_, T>) {
    let cols = mat.ncols();
    for i in 0..mat.nrows() {
        for j in 0..cols {
            dst[i * cols + j] = mat[(i, j)];
        }
    }
}

/// Shape and transposition of one row-major GEMM.
///
/// Computes `C(m x n) = alpha * op(A) * op(B)` where `op(A)` is `m x k` and
/// `op(B)` is `k x n`. With `trans_a`, `A` is stored as `k x m`; with
/// `trans_b`, `B` is stored as `n x k`.
#[derive(Debug, Clone, Copy)]
pub struct GemmShape {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub trans_a: bool,
    pub trans_b: bool,
}

/// Row-major GEMM through faer.
///
/// `C^T = op(B)^T op(A)^T` is evaluated on column-major views of the same
/// buffers. With `accumulate`, the product is added to `c` instead of
/// replacing it.
pub fn gemm_row_major<T: Scalar>(
    c: &mut [T],
    a: &[T],
    b: &[T],
    shape: GemmShape,
    alpha: T,
    accumulate: bool,
) {
    let GemmShape {
        m,
        n,
        k,
        trans_a,
        trans_b,
    } = shape;
    if m == 0 || n == 0 {
        return;
    }
    // op(A)^T as a k x m matrix
    let a_t = if trans_a {
        MatRef::from_column_major_slice(a, m, k).transpose()
    } else {
        MatRef::from_column_major_slice(a, k, m)
    };
    // op(B)^T as an n x k matrix
    let b_t = if trans_b {
        MatRef::from_column_major_slice(b, k, n).transpose()
    } else {
        MatRef::from_column_major_slice(b, n, k)
    };
    let c_t = MatMut::from_column_major_slice_mut(c, n, m);
    let accum = if accumulate { Accum::Add } else { Accum::Replace };
    matmul(c_t, accum, b_t, a_t, alpha, Par::Seq);
}

/// Factors of a thin SVD, all row-major.
#[derive(Debug, Clone)]
pub struct ThinSvd<T> {
    /// `m x r` left singular vectors.
    pub u: Vec<T>,
    /// `r` singular values in descending order.
    pub s: Vec<f64>,
    /// `r x n` conjugate-transposed right singular vectors.
    pub vh: Vec<T>,
}

/// Thin SVD of a row-major `m x n` matrix.
///
/// # Errors
///
/// Returns `SvdError` if faer fails to converge.
pub fn thin_svd<T: Scalar>(data: &[T], m: usize, n: usize) -> Result<ThinSvd<T>, TensorError> {
    let r = m.min(n);
    if r == 0 {
        return Ok(ThinSvd {
            u: Vec::new(),
            s: Vec::new(),
            vh: Vec::new(),
        });
    }
    let mat = mat_from_row_major(data, m, n);
    let svd: Svd<T> = Svd::new_thin(mat).map_err(|e: SvdError| TensorError::SvdError {
        message: format!("{e:?}"),
    })?;

    let u_mat = svd.U();
    let s_diag = svd.S();
    let v_mat = svd.V();

    let mut u = vec![T::zero(); m * r];
    write_row_major(&mut u, u_mat);
    let s = (0..r).map(|i| s_diag[i].real_part()).collect();
    let mut vh = Vec::with_capacity(r * n);
    for i in 0..r {
        for j in 0..n {
            vh.push(v_mat[(j, i)].conjugate());
        }
    }
    Ok(ThinSvd { u, s, vh })
}

/// Thin QR of a row-major `m x n` matrix, returning `(Q (m x r), R (r x n))`.
pub fn thin_qr<T: Scalar>(data: &[T], m: usize, n: usize) -> (Vec<T>, Vec<T>) {
    let r = m.min(n);
    if r == 0 {
        return (Vec::new(), Vec::new());
    }
    let qr: Qr<T> = Qr::new(mat_from_row_major(data, m, n));
    let q_mat = qr.compute_thin_Q();
    let r_mat = qr.thin_R();

    let mut q = vec![T::zero(); m * r];
    write_row_major(&mut q, q_mat.as_ref());
    let mut rr = vec![T::zero(); r * n];
    write_row_major(&mut rr, r_mat);
    (q, rr)
}

/// Solve `A X = B` for square row-major `A` and `B` of order `n`.
///
/// # Errors
///
/// Returns `LinearSolveError` if the solution is not finite.
pub fn solve_row_major<T: Scalar>(a: &[T], b: &[T], n: usize) -> Result<Vec<T>, TensorError> {
    let a_mat = Mat::from_fn(n, n, |i, j| a[i * n + j]);
    let lu = a_mat.partial_piv_lu();
    let mut x_mat = Mat::from_fn(n, n, |i, j| b[i * n + j]);
    lu.solve_in_place(&mut x_mat);

    let mut x = vec![T::zero(); n * n];
    write_row_major(&mut x, x_mat.as_ref());
    if x.iter().any(|v| !v.modulus().is_finite()) {
        return Err(TensorError::LinearSolveError {
            message: format!("non-finite solution of {n}x{n} system"),
        });
    }
    Ok(x)
}
