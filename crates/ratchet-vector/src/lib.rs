//! Growable append-only vector with lock-free concurrent access.
//!
//! # Architecture
//!
//! ```text
//! AtomicVector<T, R>
//! ├── BucketTable (32 atomic bucket pointers, installed on demand)
//! │   └── Bucket b → 2^b atomic slots, zero = empty
//! ├── size: AtomicU32 (publication barrier for appends)
//! ├── SensitiveSection (per-thread reader counters for deferred release)
//! └── R: Refcount<T> (element lifetime policy)
//! ```
//!
//! Appends claim slots by CAS and publish them by bumping `size`. Reads
//! and writes address published slots directly; a write defers releasing
//! the value it replaced until the sensitive section has drained.
//!
//! `unsafe` is confined to [`bucket`], which hands out references to
//! installed buckets.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bucket;
pub mod config;
pub mod index;
pub mod section;
pub mod vector;

pub use config::{ConfigError, ValidatedConfig, VectorConfig};
pub use index::{MAX_BUCKETS, MAX_LEN};
pub use section::{SectionGuard, SensitiveSection};
pub use vector::{AtomicVector, Held};
