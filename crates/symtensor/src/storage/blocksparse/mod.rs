//! Block-sparse storage for symmetric tensors.
//!
//! # Overview
//!
//! A tensor's data is split into dense blocks, one per combination of
//! segment symmetries (one per axis) whose charges sum to the identity.
//! Every block lives in a single contiguous allocation.
//!
//! ## Core Types
//!
//! - [`BlockKey`] - One symmetry per axis, identifying a block
//! - [`BlockOffsets`] - Sorted mapping from keys to storage offsets
//! - [`Core`] - Edges plus the block table and the bulk buffer
//!
//! # Example
//!
//! ```
//! use symtensor::{Edge, U1};
//! use symtensor::arena::ScratchArena;
//! use symtensor::storage::blocksparse::Core;
//!
//! let up = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
//! let down = Edge::new([(U1(0), 1), (U1(-1), 2)]).unwrap();
//! let core: Core<f64, U1> = Core::new(vec![up, down], &ScratchArena::new());
//!
//! for (entry, data) in core.iter_blocks() {
//!     println!("{}: {} elements", entry.key, data.len());
//! }
//! ```

mod block;
mod block_offsets;
mod block_core;
pub(crate) mod enumerate;

pub use block::BlockKey;
pub use block_offsets::{BlockEntry, BlockOffsets};
pub use block_core::Core;
