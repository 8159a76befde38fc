//! Block-wise decompositions.
//!
//! Decompositions work on a tensor by:
//! 1. Choosing which axes become rows; the rest become columns
//! 2. Reversing incoming fermionic axes and merging both groups, so the
//!    tensor is a block-diagonal matrix with one block per row symmetry
//! 3. Factoring every block with faer
//! 4. Splitting the factors back into tensors joined by a new bond axis
//!
//! The row factor holds the bond last with its arrow pointing in and the
//! column factor holds it first pointing out, so contracting the factors
//! back together reproduces the tensor without extra signs.
//!
//! # Example
//!
//! ```
//! use symtensor::{Edge, QrFactor, SvdCut, Tensor, U1};
//!
//! let edge = Edge::new([(U1(0), 2), (U1(1), 2)]).unwrap();
//! let mut t: Tensor<f64, U1> = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
//! t.range(1.0, 1.0);
//!
//! let svd = t.svd(["i"], "u", "v", "su", "sv", SvdCut::NoCut).unwrap();
//! let back = svd.u.contract(&svd.s, [("u", "su")]).unwrap()
//!     .contract(&svd.v, [("sv", "v")]).unwrap();
//! assert!(back.try_sub(&t).unwrap().norm(2.0) < 1e-10);
//!
//! let qr = t.qr(QrFactor::Q, ["i"], "q", "r").unwrap();
//! assert_eq!(qr.r.names(), &["r".to_string(), "j".to_string()]);
//! ```

mod exp;
mod multiple;
mod qr;
mod svd;
mod util;

pub use multiple::SvdFactor;
pub use qr::{QrFactor, QrResult};
pub use svd::{SvdCut, SvdResult};
