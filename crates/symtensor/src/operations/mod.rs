//! Tensor operations.
//!
//! Every structural change of a tensor goes through one routine:
//!
//! ```text
//! EdgeOperator (rename → split → reverse → transpose → align → merge)
//!     ├── edge_ops: edge_rename, transpose, reverse_edge, merge_edge, split_edge
//!     ├── contract / trace: bring blocks into matrix form
//!     └── decomposition: matrix form per block and back
//! ```
//!
//! The remaining modules work on values: arithmetic, conjugation, norms and
//! point insertion/removal.

mod arithmetic;
mod conjugate;
pub(crate) mod edge_operator;
mod edge_ops;
mod expand;
pub(crate) mod fusion;
mod norm;

pub use edge_operator::EdgeOperator;
pub use expand::ExpandAxis;
