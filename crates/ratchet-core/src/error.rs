//! Error types shared across the Ratchet workspace.
//!
//! Bounds violations on a live vector ([`VectorError`]) and element
//! decoding failures ([`SerdeError`]). Both are recoverable: they are
//! reported to the immediate caller and never poison the vector.

use std::error::Error;
use std::fmt;

/// Errors from vector operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VectorError {
    /// `read` at or beyond the current size.
    ReadPastEnd {
        /// The requested index.
        index: usize,
        /// The vector size observed at the time of the call.
        size: usize,
    },
    /// `write` at or beyond the current size. Use `append` to grow.
    WritePastEnd {
        /// The requested index.
        index: usize,
        /// The vector size observed at the time of the call.
        size: usize,
    },
    /// A published slot was never filled (a bulk load aborted midway).
    EmptySlot {
        /// The unfilled index.
        index: usize,
    },
    /// A bulk load was attempted on a vector that already holds elements.
    NotEmpty {
        /// The current size of the vector.
        size: usize,
    },
    /// A bulk load asked for more elements than the index space holds.
    CapacityExhausted {
        /// The number of elements requested.
        requested: usize,
    },
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadPastEnd { index, size } => {
                write!(f, "read past end of vector: index {index}, size {size}")
            }
            Self::WritePastEnd { index, size } => write!(
                f,
                "write past end of vector: index {index}, size {size}; use append instead"
            ),
            Self::EmptySlot { index } => write!(f, "slot {index} was never filled"),
            Self::NotEmpty { size } => {
                write!(f, "bulk load requires an empty vector, found {size} elements")
            }
            Self::CapacityExhausted { requested } => {
                write!(f, "{requested} elements exceed the vector's index space")
            }
        }
    }
}

impl Error for VectorError {}

/// Errors from element encoding and decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerdeError {
    /// The payload ended before a complete element was decoded.
    Truncated {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes remaining in the payload.
        available: usize,
    },
    /// The payload does not start with the expected magic number.
    BadMagic {
        /// The magic number found.
        found: u32,
    },
    /// The payload format version is not supported by this build.
    UnsupportedVersion {
        /// The version found.
        found: u8,
    },
    /// An enumerated tag (codec, element kind) is not recognized.
    UnknownTag {
        /// Which tag was being decoded.
        what: &'static str,
        /// The unrecognized value.
        tag: u8,
    },
    /// The payload is structurally invalid (e.g. decompression failed).
    Corrupt {
        /// Human-readable description of the problem.
        detail: String,
    },
    /// The element cannot be encoded or decoded by this policy.
    Invalid {
        /// Human-readable description of the problem.
        detail: String,
    },
}

impl fmt::Display for SerdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => write!(
                f,
                "truncated payload: needed {needed} bytes, {available} available"
            ),
            Self::BadMagic { found } => write!(f, "bad payload magic {found:#010x}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported payload version {found}")
            }
            Self::UnknownTag { what, tag } => write!(f, "unknown {what} tag {tag}"),
            Self::Corrupt { detail } => write!(f, "corrupt payload: {detail}"),
            Self::Invalid { detail } => write!(f, "invalid element: {detail}"),
        }
    }
}

impl Error for SerdeError {}
