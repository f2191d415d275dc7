//! Ratchet: a concurrent, growable, append-only vector with parallel
//! bulk persistence.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Ratchet sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use ratchet::prelude::*;
//!
//! let vec = TensorVector::new();
//! let t = Arc::new(Tensor::from_f32(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap());
//! assert_eq!(vec.append(&t), 0);
//!
//! let read = vec.read(0).unwrap();
//! assert_eq!(read.shape(), &[2, 2]);
//!
//! // Persist and restore.
//! let codec = TensorCodec::default();
//! let mut file = tempfile::tempfile().unwrap();
//! vec.save(&codec, &mut file).unwrap();
//! # use std::io::{Seek, SeekFrom};
//! file.seek(SeekFrom::Start(0)).unwrap();
//! let mut back = TensorVector::new();
//! back.load(&codec, &file, &LoadConfig::default()).unwrap();
//! assert_eq!(*back.read(0).unwrap(), *t);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ratchet-core` | Element contract, refcount and serde policies, errors |
//! | [`vector`] | `ratchet-vector` | `AtomicVector`, sensitive section, buckets |
//! | [`persist`] | `ratchet-persist` | Bulk save and parallel load |
//! | [`tensor`] | `ratchet-tensor` | `Arc`-shared tensors and their policies |
//! | [`registry`] | `ratchet-registry` | Named registry of typed tensor vectors |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Element contract, policy traits, and error types (`ratchet-core`).
pub use ratchet_core as types;

/// The vector and its reclamation machinery (`ratchet-vector`).
///
/// [`vector::AtomicVector`] is the main type; [`vector::SensitiveSection`]
/// is usable on its own for deferred release of other shared values.
pub use ratchet_vector as vector;

/// Bulk persistence (`ratchet-persist`).
pub use ratchet_persist as persist;

/// Reference-counted tensors (`ratchet-tensor`).
pub use ratchet_tensor as tensor;

/// Named registry (`ratchet-registry`).
///
/// [`registry::VectorRegistry::global`] is the process-wide instance.
pub use ratchet_registry as registry;

/// Common imports for typical Ratchet usage.
pub mod prelude {
    // Core contracts
    pub use ratchet_core::{Element, NoopRefcount, Refcount, Serde};

    // Errors
    pub use ratchet_core::{SerdeError, VectorError};
    pub use ratchet_persist::PersistError;
    pub use ratchet_registry::RegistryError;

    // Vector
    pub use ratchet_vector::{AtomicVector, Held, ValidatedConfig, VectorConfig};

    // Persistence
    pub use ratchet_persist::{load, load_from_path, save, save_to_path, LoadConfig};

    // Tensors
    pub use ratchet_tensor::{
        ArcVector, BufferCodec, ElementKind, Tensor, TensorCodec, TensorVector,
    };

    // Registry
    pub use ratchet_registry::{TypedVector, VectorRegistry};
}
