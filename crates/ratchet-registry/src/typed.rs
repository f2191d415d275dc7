//! Tensor vectors restricted to one element kind.

use std::fmt;
use std::sync::Arc;

use ratchet_core::SerdeError;
use ratchet_tensor::{BufferCodec, ElementKind, Tensor, TensorCodec, TensorVector};
use ratchet_vector::{ConfigError, ValidatedConfig, VectorConfig};

use crate::error::RegistryError;

/// A [`TensorVector`] that only accepts tensors of one [`ElementKind`].
pub struct TypedVector {
    kind: ElementKind,
    vector: TensorVector,
}

impl TypedVector {
    /// An empty vector of `kind` tensors.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            vector: TensorVector::new(),
        }
    }

    /// An empty vector, validating `config` first.
    pub fn with_config(kind: ElementKind, config: &VectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            kind,
            vector: TensorVector::with_config(config)?,
        })
    }

    /// An empty vector from an already validated configuration.
    pub fn with_validated(kind: ElementKind, config: &ValidatedConfig) -> Self {
        Self {
            kind,
            vector: TensorVector::with_validated(config),
        }
    }

    /// The element kind this vector accepts.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Append `tensor`; returns the new size.
    pub fn append(&self, tensor: &Arc<Tensor>) -> Result<usize, RegistryError> {
        self.check(tensor)?;
        Ok(self.vector.append(tensor) + 1)
    }

    /// The tensor at `index`.
    pub fn read(&self, index: usize) -> Result<Arc<Tensor>, RegistryError> {
        Ok(self.vector.read(index)?)
    }

    /// Replace the tensor at `index`.
    pub fn write(&self, index: usize, tensor: &Arc<Tensor>) -> Result<(), RegistryError> {
        self.check(tensor)?;
        Ok(self.vector.write(index, tensor)?)
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Width of the vector's sensitive section.
    pub fn section_slots(&self) -> usize {
        self.vector.section_slots()
    }

    /// The underlying vector.
    pub fn vector(&self) -> &TensorVector {
        &self.vector
    }

    pub(crate) fn vector_mut(&mut self) -> &mut TensorVector {
        &mut self.vector
    }

    fn check(&self, tensor: &Tensor) -> Result<(), RegistryError> {
        if tensor.kind() != self.kind {
            return Err(RegistryError::KindMismatch {
                expected: self.kind,
                found: tensor.kind(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for TypedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedVector")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

/// A [`TensorCodec`] that rejects payloads of the wrong element kind.
#[derive(Clone, Debug)]
pub(crate) struct KindCodec {
    pub(crate) kind: ElementKind,
    pub(crate) inner: TensorCodec,
}

impl BufferCodec<Tensor> for KindCodec {
    fn encode(&self, value: &Tensor, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        self.inner.encode(value, out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tensor, SerdeError> {
        let tensor = self.inner.decode(bytes)?;
        if tensor.kind() != self.kind {
            return Err(SerdeError::Invalid {
                detail: format!("{} tensor in a {} vector", tensor.kind(), self.kind),
            });
        }
        Ok(tensor)
    }
}
