//! Process-wide named registry of typed tensor vectors.
//!
//! Each entry is a [`TypedVector`]: a tensor vector that only accepts
//! `f32` or only `f64` tensors. Entries are created, fetched, destroyed,
//! saved, and loaded by name through a [`VectorRegistry`], usually the
//! [`global`](VectorRegistry::global) one.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod registry;
pub mod typed;

pub use error::RegistryError;
pub use registry::{RegistryConfig, VectorRegistry};
pub use typed::TypedVector;
