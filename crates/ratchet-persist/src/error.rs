//! Error types for bulk persistence.

use std::fmt;
use std::io;

use ratchet_core::{SerdeError, VectorError};

/// Errors from [`save`](crate::save) and [`load`](crate::load).
///
/// A failed save leaves a partial file behind and a failed load leaves a
/// partially filled vector; neither is rolled back.
#[derive(Debug)]
pub enum PersistError {
    /// An I/O error, including short reads and writes.
    Io(io::Error),
    /// The file does not open with the vector magic number.
    BadMagic {
        /// The value found in its place.
        found: i32,
    },
    /// The header or directory runs past the end of the file.
    Truncated {
        /// Bytes the header and directory need, from the start position.
        needed: u64,
        /// Bytes actually available.
        available: u64,
    },
    /// A directory entry points outside the payload region.
    CorruptDirectory {
        /// Element index of the entry.
        index: usize,
        /// The recorded offset.
        offset: u64,
        /// Length of the file.
        file_len: u64,
    },
    /// A payload's length prefix runs past the end of the file.
    PayloadOutOfBounds {
        /// Element index of the payload.
        index: usize,
        /// Offset of its length prefix.
        offset: u64,
        /// The recorded payload length.
        len: u64,
        /// Length of the file.
        file_len: u64,
    },
    /// An element could not be encoded while saving.
    Encode {
        /// Element index.
        index: usize,
        /// The serde failure.
        source: SerdeError,
    },
    /// A payload could not be decoded while loading.
    Decode {
        /// Element index.
        index: usize,
        /// The serde failure.
        source: SerdeError,
    },
    /// The vector rejected an operation (non-empty load target, unfilled slot).
    Vector(VectorError),
    /// A decoder thread could not be started.
    ThreadSpawn {
        /// The OS error, rendered.
        reason: String,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::BadMagic { found } => write!(
                f,
                "bad magic value {found:#010x} (expected {:#010x})",
                crate::MAGIC
            ),
            Self::Truncated { needed, available } => write!(
                f,
                "header and directory need {needed} bytes but only {available} are present"
            ),
            Self::CorruptDirectory {
                index,
                offset,
                file_len,
            } => write!(
                f,
                "directory entry {index} points at {offset}, outside the {file_len}-byte file"
            ),
            Self::PayloadOutOfBounds {
                index,
                offset,
                len,
                file_len,
            } => write!(
                f,
                "payload {index} at {offset} claims {len} bytes, past the end of the \
                 {file_len}-byte file"
            ),
            Self::Encode { index, source } => {
                write!(f, "could not serialize element {index}: {source}")
            }
            Self::Decode { index, source } => {
                write!(f, "could not deserialize element {index}: {source}")
            }
            Self::Vector(e) => write!(f, "vector error: {e}"),
            Self::ThreadSpawn { reason } => write!(f, "failed to spawn load worker: {reason}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode { source, .. } | Self::Decode { source, .. } => Some(source),
            Self::Vector(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<VectorError> for PersistError {
    fn from(e: VectorError) -> Self {
        Self::Vector(e)
    }
}
