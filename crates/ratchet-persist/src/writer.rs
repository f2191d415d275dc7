//! Sequential bulk save.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use ratchet_core::{Element, Refcount, Serde};
use ratchet_vector::AtomicVector;

use crate::codec::{self, HEADER_LEN, WORD};
use crate::error::PersistError;

/// What a [`save`] wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveSummary {
    /// Elements written.
    pub elements: usize,
    /// Total payload bytes, excluding length prefixes.
    pub payload_bytes: u64,
    /// Stream position just past the last entry.
    pub end: u64,
}

/// Write every element of `vector` to `out` at its current position.
///
/// The element count is fixed when the save starts; elements appended
/// afterwards are not included. Each element is read (and its reference
/// held) only while it is being encoded, so concurrent writes may or may
/// not be reflected, but every saved value is one that was stored at
/// its index at some point.
///
/// On return the stream is positioned just past the last entry.
pub fn save<T, R, S, W>(
    vector: &AtomicVector<T, R>,
    serde: &S,
    out: &mut W,
) -> Result<SaveSummary, PersistError>
where
    T: Element,
    R: Refcount<T>,
    S: Serde<T> + ?Sized,
    W: Write + Seek,
{
    let base = out.stream_position()?;
    let count = vector.len();
    let directory_at = base + HEADER_LEN;
    let mut w = BufWriter::new(&mut *out);

    codec::encode_header(&mut w, count)?;
    // Placeholder directory, patched once the offsets are known.
    let zeros = vec![0u64; count];
    codec::encode_directory(&mut w, &zeros)?;

    let mut offsets = zeros;
    let mut at = directory_at + count as u64 * WORD;
    let mut payload_bytes = 0u64;
    let mut buf = Vec::new();
    for (index, offset) in offsets.iter_mut().enumerate() {
        let held = vector.get(index)?;
        buf.clear();
        serde
            .save(*held, &mut buf)
            .map_err(|source| PersistError::Encode { index, source })?;
        drop(held);

        *offset = at;
        codec::write_word(&mut w, buf.len() as u64)?;
        w.write_all(&buf)?;
        at += WORD + buf.len() as u64;
        payload_bytes += buf.len() as u64;
    }

    w.seek(SeekFrom::Start(directory_at))?;
    codec::encode_directory(&mut w, &offsets)?;
    w.seek(SeekFrom::Start(at))?;
    w.flush()?;

    tracing::info!(elements = count, payload_bytes, end = at, "saved vector");
    Ok(SaveSummary {
        elements: count,
        payload_bytes,
        end: at,
    })
}

/// Create (or truncate) the file at `path` and [`save`] into it.
pub fn save_to_path<T, R, S>(
    vector: &AtomicVector<T, R>,
    serde: &S,
    path: impl AsRef<Path>,
) -> Result<SaveSummary, PersistError>
where
    T: Element,
    R: Refcount<T>,
    S: Serde<T> + ?Sized,
{
    let mut file = File::create(path)?;
    let summary = save(vector, serde, &mut file)?;
    file.sync_all()?;
    Ok(summary)
}
