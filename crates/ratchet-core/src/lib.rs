//! Core contracts for the Ratchet concurrent vector.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! what a vector element must look like, the two policies a vector
//! consumes from its environment (reference counting and byte-level
//! serialization), and the error types shared across the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod error;
pub mod traits;

pub use element::Element;
pub use error::{SerdeError, VectorError};
pub use traits::{NoopRefcount, Refcount, Serde};
