//! Backend abstraction for the dense kernels behind block operations.
//!
//! # Backends
//!
//! - `GenericBackend`: Naive loop-based strided moves (always available)
//!
//! # faer Integration
//!
//! The `faer_interop` module maps row-major blocks onto faer's column-major
//! matrices for GEMM, SVD, QR and LU solves.

mod faer_interop;
mod generic;
mod permutation;

pub use faer_interop::{
    GemmShape, ThinSvd, gemm_row_major, mat_from_row_major, solve_row_major, thin_qr, thin_svd,
    write_row_major,
};
pub use generic::GenericBackend;
pub use permutation::{PermutationBackend, StridedMove};
