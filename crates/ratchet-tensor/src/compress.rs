//! Block compression for tensor payloads.
//!
//! Payloads are split into chunks of at most `chunk_len` raw bytes, each
//! compressed independently with the LZ4 block format, so no single
//! compressor call has to address more than one chunk.

use ratchet_core::SerdeError;

/// Compression applied to a tensor's element bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Stored as-is.
    None,
    /// LZ4 block format.
    #[default]
    Lz4,
}

impl Compression {
    /// Wire tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Lz4 => 1,
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Lz4),
            _ => None,
        }
    }

    /// Upper bound on raw bytes one stored byte can expand to.
    pub(crate) fn max_expansion(self) -> u64 {
        match self {
            Self::None => 1,
            Self::Lz4 => 255,
        }
    }
}

/// Compress `raw` onto the end of `out`, returning the stored length.
pub(crate) fn compress_chunk(compression: Compression, raw: &[u8], out: &mut Vec<u8>) -> usize {
    match compression {
        Compression::None => {
            out.extend_from_slice(raw);
            raw.len()
        }
        Compression::Lz4 => {
            let start = out.len();
            out.resize(start + lz4_flex::block::get_maximum_output_size(raw.len()), 0);
            // The buffer is sized for the worst case, so this cannot fail.
            let written = lz4_flex::block::compress_into(raw, &mut out[start..]).unwrap_or(0);
            out.truncate(start + written);
            written
        }
    }
}

/// Decompress `stored` into exactly `out.len()` bytes.
pub(crate) fn decompress_chunk(
    compression: Compression,
    stored: &[u8],
    out: &mut [u8],
) -> Result<(), SerdeError> {
    match compression {
        Compression::None => {
            if stored.len() != out.len() {
                return Err(SerdeError::Corrupt {
                    detail: format!(
                        "uncompressed chunk stores {} bytes for {} raw",
                        stored.len(),
                        out.len()
                    ),
                });
            }
            out.copy_from_slice(stored);
            Ok(())
        }
        Compression::Lz4 => {
            let n = lz4_flex::block::decompress_into(stored, out).map_err(|e| {
                SerdeError::Corrupt {
                    detail: format!("lz4 chunk: {e}"),
                }
            })?;
            if n != out.len() {
                return Err(SerdeError::Corrupt {
                    detail: format!("lz4 chunk inflated to {n} bytes, expected {}", out.len()),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for c in [Compression::None, Compression::Lz4] {
            assert_eq!(Compression::from_tag(c.tag()), Some(c));
        }
        assert_eq!(Compression::from_tag(9), None);
    }

    #[test]
    fn lz4_shrinks_repetitive_input() {
        let raw = vec![7u8; 64 * 1024];
        let mut stored = vec![0xAA];
        let n = compress_chunk(Compression::Lz4, &raw, &mut stored);
        assert_eq!(stored.len(), n + 1);
        assert!(n < raw.len() / 10);

        let mut back = vec![0u8; raw.len()];
        decompress_chunk(Compression::Lz4, &stored[1..], &mut back).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn lz4_length_mismatch_is_corrupt() {
        let raw = vec![1u8; 100];
        let mut stored = Vec::new();
        compress_chunk(Compression::Lz4, &raw, &mut stored);
        let mut short = vec![0u8; 101];
        assert!(matches!(
            decompress_chunk(Compression::Lz4, &stored, &mut short),
            Err(SerdeError::Corrupt { .. })
        ));
    }

    #[test]
    fn garbage_lz4_is_corrupt() {
        let mut out = vec![0u8; 32];
        assert!(decompress_chunk(Compression::Lz4, &[0xF0, 0xFF, 0xFF], &mut out).is_err());
    }

    #[test]
    fn raw_chunks_must_match_length() {
        let mut out = [0u8; 3];
        assert!(decompress_chunk(Compression::None, &[1, 2], &mut out).is_err());
        decompress_chunk(Compression::None, &[1, 2, 3], &mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);
    }
}
