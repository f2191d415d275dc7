//! Tensor construction errors.

use std::error::Error;
use std::fmt;

use crate::tensor::ElementKind;

/// Errors from building a [`Tensor`](crate::Tensor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TensorError {
    /// The data length does not match the product of the shape.
    ShapeMismatch {
        /// Element count implied by the shape.
        expected: usize,
        /// Element count actually supplied.
        found: usize,
    },
    /// The product of the shape overflows `usize`.
    ShapeOverflow,
    /// Raw bytes do not hold a whole number of elements of the kind.
    MisalignedBytes {
        /// The element kind being decoded.
        kind: ElementKind,
        /// The byte length supplied.
        len: usize,
    },
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { expected, found } => write!(
                f,
                "shape implies {expected} elements but {found} were supplied"
            ),
            Self::ShapeOverflow => write!(f, "shape element count overflows usize"),
            Self::MisalignedBytes { kind, len } => {
                write!(f, "{len} bytes is not a whole number of {kind} elements")
            }
        }
    }
}

impl Error for TensorError {}
