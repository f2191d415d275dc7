//! Tensor wire format.
//!
//! ```text
//! u32  magic "RTNS"
//! u8   version (1)
//! u8   element kind (1 = f32, 2 = f64)
//! u8   compression (0 = none, 1 = lz4)
//! u32  ndim
//! u64  dims[ndim]
//! u64  raw_len                      element bytes before compression
//! u32  chunk_count
//! (u64 raw_len, u64 stored_len)     per chunk
//! ...  chunk bytes, back to back
//! ```
//!
//! All integers and element values are little-endian. Compression is
//! chosen per tensor from its raw size, so small tensors skip the
//! compressor entirely.

use ratchet_core::SerdeError;

use crate::compress::{self, Compression};
use crate::arc_vector::BufferCodec;
use crate::tensor::{element_count, ElementKind, Tensor};

/// Magic number opening every encoded tensor.
pub const TENSOR_MAGIC: u32 = u32::from_le_bytes(*b"RTNS");

/// Current wire format version.
pub const TENSOR_VERSION: u8 = 1;

/// Highest rank a decoder accepts.
pub const MAX_RANK: usize = 64;

/// Size-aware tensor encoder and decoder.
#[derive(Clone, Debug)]
pub struct TensorCodec {
    /// Compression for payloads at or above `compress_threshold`.
    pub compression: Compression,
    /// Raw size in bytes from which `compression` applies.
    pub compress_threshold: usize,
    /// Largest raw span compressed as one chunk. Zero is treated as one.
    pub chunk_len: usize,
}

impl TensorCodec {
    /// Default compression threshold: 4 KiB.
    pub const DEFAULT_COMPRESS_THRESHOLD: usize = 4 << 10;

    /// Default chunk length: 64 MiB.
    pub const DEFAULT_CHUNK_LEN: usize = 64 << 20;

    /// A codec that never compresses.
    pub fn uncompressed() -> Self {
        Self {
            compression: Compression::None,
            ..Self::default()
        }
    }

    /// The compression applied to a payload of `raw_len` bytes.
    pub fn compression_for(&self, raw_len: usize) -> Compression {
        if raw_len >= self.compress_threshold {
            self.compression
        } else {
            Compression::None
        }
    }
}

impl Default for TensorCodec {
    fn default() -> Self {
        Self {
            compression: Compression::Lz4,
            compress_threshold: Self::DEFAULT_COMPRESS_THRESHOLD,
            chunk_len: Self::DEFAULT_CHUNK_LEN,
        }
    }
}

impl BufferCodec<Tensor> for TensorCodec {
    fn encode(&self, tensor: &Tensor, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        let mut raw = Vec::new();
        tensor.write_le_bytes(&mut raw);
        let compression = self.compression_for(raw.len());

        out.extend_from_slice(&TENSOR_MAGIC.to_le_bytes());
        out.push(TENSOR_VERSION);
        out.push(tensor.kind().tag());
        out.push(compression.tag());
        out.extend_from_slice(&(tensor.shape().len() as u32).to_le_bytes());
        for &dim in tensor.shape() {
            out.extend_from_slice(&(dim as u64).to_le_bytes());
        }
        out.extend_from_slice(&(raw.len() as u64).to_le_bytes());

        let chunk_len = self.chunk_len.max(1);
        let chunk_count = raw.len().div_ceil(chunk_len);
        let count = u32::try_from(chunk_count).map_err(|_| SerdeError::Invalid {
            detail: format!("{chunk_count} chunks exceed the u32 chunk count"),
        })?;
        out.extend_from_slice(&count.to_le_bytes());

        // Chunk table is patched once each stored length is known.
        let table = out.len();
        out.resize(table + chunk_count * 16, 0);
        for (i, chunk) in raw.chunks(chunk_len).enumerate() {
            let stored = compress::compress_chunk(compression, chunk, out);
            let entry = table + i * 16;
            out[entry..entry + 8].copy_from_slice(&(chunk.len() as u64).to_le_bytes());
            out[entry + 8..entry + 16].copy_from_slice(&(stored as u64).to_le_bytes());
        }
        tracing::trace!(
            raw = raw.len(),
            chunks = chunk_count,
            ?compression,
            "encoded tensor"
        );
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tensor, SerdeError> {
        let mut r = Cursor::new(bytes);

        let magic = r.u32()?;
        if magic != TENSOR_MAGIC {
            return Err(SerdeError::BadMagic { found: magic });
        }
        let version = r.u8()?;
        if version != TENSOR_VERSION {
            return Err(SerdeError::UnsupportedVersion { found: version });
        }
        let kind_tag = r.u8()?;
        let kind = ElementKind::from_tag(kind_tag).ok_or(SerdeError::UnknownTag {
            what: "element kind",
            tag: kind_tag,
        })?;
        let compression_tag = r.u8()?;
        let compression = Compression::from_tag(compression_tag).ok_or(SerdeError::UnknownTag {
            what: "compression",
            tag: compression_tag,
        })?;

        let ndim = r.u32()? as usize;
        if ndim > MAX_RANK {
            return Err(corrupt(format!("rank {ndim} exceeds {MAX_RANK}")));
        }
        let mut shape = Vec::with_capacity(ndim);
        for _ in 0..ndim {
            shape.push(r.usize()?);
        }
        let elements = element_count(&shape).map_err(|e| corrupt(e.to_string()))?;
        let raw_len = r.usize()?;
        if elements.checked_mul(kind.byte_width()) != Some(raw_len) {
            return Err(corrupt(format!(
                "raw length {raw_len} does not hold {elements} {kind} elements"
            )));
        }

        let chunk_count = r.u32()? as usize;
        let mut chunks = Vec::with_capacity(chunk_count.min(r.remaining() / 16));
        let mut raw_total = 0u64;
        let mut stored_total = 0u64;
        for _ in 0..chunk_count {
            let raw = r.u64()?;
            let stored = r.u64()?;
            if raw > stored.saturating_mul(compression.max_expansion()) {
                return Err(corrupt(format!(
                    "chunk of {stored} stored bytes claims {raw} raw"
                )));
            }
            raw_total = raw_total.saturating_add(raw);
            stored_total = stored_total.saturating_add(stored);
            chunks.push((raw as usize, stored as usize));
        }
        if raw_total != raw_len as u64 {
            return Err(corrupt(format!(
                "chunks hold {raw_total} raw bytes, header says {raw_len}"
            )));
        }
        if stored_total != r.remaining() as u64 {
            return Err(corrupt(format!(
                "chunks store {stored_total} bytes but {} follow the table",
                r.remaining()
            )));
        }

        let mut raw = vec![0u8; raw_len];
        let mut at = 0;
        for (raw_chunk, stored_chunk) in chunks {
            let stored = r.take(stored_chunk)?;
            compress::decompress_chunk(compression, stored, &mut raw[at..at + raw_chunk])?;
            at += raw_chunk;
        }

        Tensor::from_le_bytes(kind, &shape, &raw).map_err(|e| corrupt(e.to_string()))
    }
}

fn corrupt(detail: String) -> SerdeError {
    SerdeError::Corrupt { detail }
}

// ── Byte cursor ─────────────────────────────────────────────────

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SerdeError> {
        if n > self.remaining() {
            return Err(SerdeError::Truncated {
                needed: self.pos + n,
                available: self.bytes.len(),
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SerdeError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, SerdeError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, SerdeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, SerdeError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn usize(&mut self) -> Result<usize, SerdeError> {
        let v = self.u64()?;
        usize::try_from(v).map_err(|_| corrupt(format!("{v} does not fit in usize")))
    }
}
