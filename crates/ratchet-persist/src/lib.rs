//! Parallel bulk save and load for Ratchet vectors.
//!
//! # Format
//!
//! ```text
//! [MAGIC i32] [count usize] [offset usize; count] [len usize | payload]*
//! ```
//!
//! Host-endian throughout. Payloads are produced and consumed by the
//! vector's [`Serde`](ratchet_core::Serde) policy; the directory lets
//! [`load`] decode them on many threads with positioned reads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod pread;
pub mod reader;
pub mod writer;

pub use config::LoadConfig;
pub use error::PersistError;
pub use reader::{load, load_from_path, LoadSummary};
pub use writer::{save, save_to_path, SaveSummary};

/// Magic number opening every saved vector.
pub const MAGIC: i32 = 0x0408_1977;
