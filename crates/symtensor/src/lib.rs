//! symtensor - block-sparse tensors with abelian symmetries
//!
//! Every axis of a tensor is an [`Edge`]: a list of segments, each tagged by
//! a symmetry value. Only blocks whose values sum to the identity are stored.
//! Fermionic symmetries add an arrow to every edge and a sign to every
//! reordering of odd blocks.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Tensor API (tensor, operations, contract, decomposition)
//!     → edge_operator, contract, trace, svd, qr, exponential
//!
//! Level 2: Block storage (storage module)
//!     → Core: edges + block table + one bulk buffer
//!
//! Level 3: Dense kernels (backend module)
//!     → strided block moves, faer GEMM / SVD / QR / LU
//! ```
//!
//! # Example
//!
//! ```
//! use symtensor::{Edge, Tensor, U1};
//!
//! let edge = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
//! let mut a: Tensor<f64, U1> = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
//! a.range(1.0, 1.0);
//!
//! // only the (0, 0) and (1, -1) blocks exist
//! assert_eq!(a.storage().len(), 5);
//!
//! let b = a.edge_rename([("i", "k"), ("j", "l")]).unwrap();
//! let c = a.contract(&b, [("j", "k")]).unwrap();
//! assert_eq!(c.names(), &["i".to_string(), "l".to_string()]);
//! ```

pub mod arena;
pub mod backend;
pub mod contract;
pub mod decomposition;
pub mod edge;
pub mod error;
pub mod name;
pub mod operations;
pub mod random;
pub mod scalar;
pub mod storage;
pub mod strides;
pub mod symmetry;
pub mod tensor;

pub use arena::{ARENA_BYTES_PER_AXIS, ScratchArena};
pub use contract::{ContractionProperties, contract};
pub use decomposition::{QrFactor, QrResult, SvdCut, SvdFactor, SvdResult};
pub use edge::Edge;
pub use error::{ErrorKind, TensorError};
pub use name::{EdgeName, InternalName};
pub use operations::{EdgeOperator, ExpandAxis};
pub use random::{RandomNormal, RandomUniform};
pub use scalar::{Scalar, c32, c64};
pub use symmetry::{FermiU1, FermiZ2, NoSymmetry, Symmetry, U1, Z2};
pub use tensor::Tensor;
