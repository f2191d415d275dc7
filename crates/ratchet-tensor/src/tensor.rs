//! Dense numeric tensors: the buffers vectors hold references to.

use std::fmt;

use smallvec::SmallVec;

use crate::error::TensorError;

/// Dimension list. Most tensors are rank 4 or below.
pub type Shape = SmallVec<[usize; 4]>;

/// Scalar type of a tensor's elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 32-bit floats.
    Float,
    /// 64-bit floats.
    Double,
}

impl ElementKind {
    /// Size of one element in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Wire tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::Float => 1,
            Self::Double => 2,
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Float),
            2 => Some(Self::Double),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
        }
    }
}

/// Element storage, one variant per [`ElementKind`].
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    /// 32-bit float elements.
    Float(Vec<f32>),
    /// 64-bit float elements.
    Double(Vec<f64>),
}

impl TensorData {
    /// The element kind.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Float(_) => ElementKind::Float,
            Self::Double(_) => ElementKind::Double,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
        }
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dense, row-major tensor of `f32` or `f64` elements.
///
/// Tensors are immutable once built and shared through `Arc<Tensor>`,
/// which is how a [`TensorVector`](crate::TensorVector) stores them.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: TensorData,
}

impl Tensor {
    /// Build a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: &[usize], data: TensorData) -> Result<Self, TensorError> {
        let expected = element_count(shape)?;
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            shape: SmallVec::from_slice(shape),
            data,
        })
    }

    /// Build an `f32` tensor.
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::Float(data))
    }

    /// Build an `f64` tensor.
    pub fn from_f64(shape: &[usize], data: Vec<f64>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::Double(data))
    }

    /// A zero-filled tensor.
    pub fn zeros(kind: ElementKind, shape: &[usize]) -> Result<Self, TensorError> {
        let n = element_count(shape)?;
        let data = match kind {
            ElementKind::Float => TensorData::Float(vec![0.0; n]),
            ElementKind::Double => TensorData::Double(vec![0.0; n]),
        };
        Self::new(shape, data)
    }

    /// Dimensions, outermost first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element kind.
    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    /// Element storage.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements (some dimension is zero).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the element data in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.kind().byte_width()
    }

    /// `f32` elements, if this is a float tensor.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::Float(v) => Some(v),
            TensorData::Double(_) => None,
        }
    }

    /// `f64` elements, if this is a double tensor.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            TensorData::Double(v) => Some(v),
            TensorData::Float(_) => None,
        }
    }

    /// Append the element data to `out` as little-endian bytes.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.byte_len());
        match &self.data {
            TensorData::Float(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
            TensorData::Double(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_le_bytes())),
        }
    }

    /// Rebuild a tensor from little-endian element bytes.
    pub fn from_le_bytes(
        kind: ElementKind,
        shape: &[usize],
        bytes: &[u8],
    ) -> Result<Self, TensorError> {
        let width = kind.byte_width();
        if bytes.len() % width != 0 {
            return Err(TensorError::MisalignedBytes {
                kind,
                len: bytes.len(),
            });
        }
        let data = match kind {
            ElementKind::Float => TensorData::Float(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ElementKind::Double => TensorData::Double(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        };
        Self::new(shape, data)
    }
}

/// Product of `shape`, or [`TensorError::ShapeOverflow`].
pub fn element_count(shape: &[usize]) -> Result<usize, TensorError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(TensorError::ShapeOverflow)
}
