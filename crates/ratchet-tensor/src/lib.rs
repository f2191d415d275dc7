//! Reference-counted tensor buffers for Ratchet vectors.
//!
//! A [`TensorVector`] is an [`ArcVector`] of tensors: tensors go in and
//! come out as `Arc<Tensor>`, and the vector holds one strong reference
//! to each stored buffer. [`TensorCodec`] persists them with
//! size-dependent LZ4 compression.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arc_vector;
pub mod compress;
pub mod error;
pub mod serde;
pub mod tensor;

pub use arc_vector::{ArcVector, BufferCodec};
pub use compress::Compression;
pub use error::TensorError;
pub use serde::{TensorCodec, TENSOR_MAGIC};
pub use tensor::{ElementKind, Shape, Tensor, TensorData};

/// A vector of shared tensors.
pub type TensorVector = ArcVector<Tensor>;
