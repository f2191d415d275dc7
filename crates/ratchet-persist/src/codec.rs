//! Binary encode/decode for the vector file format.
//!
//! ```text
//! i32    magic 0x04081977
//! usize  count
//! usize  offsets[count]       absolute file offset of each entry
//! entry  { usize len; u8 payload[len] } * count
//! ```
//!
//! Integers are host-endian and `usize` is the host word, so files are
//! portable only between hosts with the same word size and byte order.

use std::io::{Read, Write};

use crate::error::PersistError;
use crate::MAGIC;

/// Width of a `usize` field on this host.
pub const WORD: u64 = std::mem::size_of::<usize>() as u64;

/// Bytes before the directory: magic plus count.
pub const HEADER_LEN: u64 = 4 + WORD;

// ── Primitive writers ───────────────────────────────────────────

/// Write a host-endian `usize`.
pub fn write_word(w: &mut impl Write, v: u64) -> Result<(), PersistError> {
    w.write_all(&(v as usize).to_ne_bytes())?;
    Ok(())
}

/// Write the magic number and element count.
pub fn encode_header(w: &mut impl Write, count: usize) -> Result<(), PersistError> {
    w.write_all(&MAGIC.to_ne_bytes())?;
    write_word(w, count as u64)
}

/// Write the offset directory.
pub fn encode_directory(w: &mut impl Write, offsets: &[u64]) -> Result<(), PersistError> {
    for &offset in offsets {
        write_word(w, offset)?;
    }
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Decode a host-endian `usize` from its bytes.
pub fn word_from_bytes(bytes: [u8; WORD as usize]) -> u64 {
    usize::from_ne_bytes(bytes) as u64
}

/// Read a host-endian `usize`.
pub fn read_word(r: &mut impl Read) -> Result<u64, PersistError> {
    let mut buf = [0u8; WORD as usize];
    r.read_exact(&mut buf)?;
    Ok(word_from_bytes(buf))
}

/// Read and check the magic number, then read the element count.
pub fn decode_header(r: &mut impl Read) -> Result<usize, PersistError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    let found = i32::from_ne_bytes(magic);
    if found != MAGIC {
        return Err(PersistError::BadMagic { found });
    }
    Ok(read_word(r)? as usize)
}

/// Read `count` directory entries.
pub fn decode_directory(r: &mut impl Read, count: usize) -> Result<Vec<u64>, PersistError> {
    (0..count).map(|_| read_word(r)).collect()
}

/// Check every directory entry leaves room for at least a length prefix
/// between the end of the directory and the end of the file.
pub fn validate_directory(
    directory: &[u64],
    data_start: u64,
    file_len: u64,
) -> Result<(), PersistError> {
    for (index, &offset) in directory.iter().enumerate() {
        let fits = offset >= data_start
            && offset
                .checked_add(WORD)
                .is_some_and(|end| end <= file_len);
        if !fits {
            return Err(PersistError::CorruptDirectory {
                index,
                offset,
                file_len,
            });
        }
    }
    Ok(())
}
