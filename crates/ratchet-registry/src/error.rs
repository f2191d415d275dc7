//! Error types for the vector registry.

use std::fmt;

use ratchet_core::VectorError;
use ratchet_persist::PersistError;
use ratchet_tensor::ElementKind;
use ratchet_vector::ConfigError;

/// Errors from [`VectorRegistry`](crate::VectorRegistry) and
/// [`TypedVector`](crate::TypedVector) operations.
#[derive(Debug)]
pub enum RegistryError {
    /// No vector is registered under the name.
    NotFound {
        /// The requested name.
        name: String,
    },
    /// A vector is already registered under the name.
    AlreadyExists {
        /// The requested name.
        name: String,
    },
    /// A tensor of the wrong element kind was offered to a typed vector.
    KindMismatch {
        /// The vector's element kind.
        expected: ElementKind,
        /// The tensor's element kind.
        found: ElementKind,
    },
    /// The registry configuration is invalid.
    Config(ConfigError),
    /// The underlying vector rejected the operation.
    Vector(VectorError),
    /// Saving or loading failed.
    Persist(PersistError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "no such atomic vector: \"{name}\""),
            Self::AlreadyExists { name } => {
                write!(f, "atomic vector \"{name}\" already exists")
            }
            Self::KindMismatch { expected, found } => {
                write!(f, "expected a {expected} tensor, got a {found} tensor")
            }
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Vector(e) => write!(f, "{e}"),
            Self::Persist(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Vector(e) => Some(e),
            Self::Persist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for RegistryError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<VectorError> for RegistryError {
    fn from(e: VectorError) -> Self {
        Self::Vector(e)
    }
}

impl From<PersistError> for RegistryError {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}
