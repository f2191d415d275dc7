//! Parallel bulk load.
//!
//! The header and directory are read sequentially; the payloads are then
//! decoded by a pool of scoped worker threads. Worker `t` of `n` handles
//! indices `t, t + n, t + 2n, ...`, so the pool sweeps the file front to
//! back together instead of each worker seeking into its own region.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use ratchet_core::{Element, Refcount, Serde};
use ratchet_vector::AtomicVector;

use crate::codec::{self, HEADER_LEN, WORD};
use crate::config::LoadConfig;
use crate::error::PersistError;
use crate::pread;

/// What a [`load`] read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    /// Elements loaded.
    pub elements: usize,
    /// Total payload bytes, excluding length prefixes.
    pub payload_bytes: u64,
    /// Decoder threads used.
    pub threads: usize,
    /// File position just past the last entry.
    pub end: u64,
}

/// Load a vector saved by [`save`](crate::save) from `file`'s current
/// position into the empty `vector`.
///
/// Takes `&mut` on the vector: the load pre-sizes it in one step and no
/// other operation may observe it until every slot is filled. On
/// success `file` is positioned just past the last entry. On failure
/// the vector may be partially filled; unfilled slots read as
/// [`VectorError::EmptySlot`](ratchet_core::VectorError::EmptySlot) and
/// the vector should be discarded.
pub fn load<T, R, S>(
    vector: &mut AtomicVector<T, R>,
    serde: &S,
    file: &File,
    config: &LoadConfig,
) -> Result<LoadSummary, PersistError>
where
    T: Element,
    R: Refcount<T>,
    S: Serde<T> + ?Sized,
{
    let mut cursor = file;
    let base = cursor.stream_position()?;
    let file_len = file.metadata()?.len();

    let available = file_len.saturating_sub(base);
    if available < HEADER_LEN {
        return Err(PersistError::Truncated {
            needed: HEADER_LEN,
            available,
        });
    }
    let mut header = BufReader::new(file);
    let count = codec::decode_header(&mut header)?;
    let needed = (count as u64)
        .checked_mul(WORD)
        .and_then(|d| d.checked_add(HEADER_LEN))
        .unwrap_or(u64::MAX);
    if needed > available {
        return Err(PersistError::Truncated { needed, available });
    }
    let directory = codec::decode_directory(&mut header, count)?;
    drop(header);

    let data_start = base + needed;
    codec::validate_directory(&directory, data_start, file_len)?;
    vector.grow_for_load(count)?;

    let threads = config.resolved_threads().min(count).max(1);
    let job = LoadJob {
        vector: &*vector,
        serde,
        file,
        file_len,
        directory: &directory,
        initial_buffer: config.initial_buffer,
        stride: threads,
        abort: AtomicBool::new(false),
        end: AtomicU64::new(data_start),
    };
    let payload_bytes = if count == 0 { 0 } else { job.run()? };
    let end = job.end.load(Ordering::Acquire);

    cursor.seek(SeekFrom::Start(end))?;
    tracing::info!(elements = count, payload_bytes, threads, end, "loaded vector");
    Ok(LoadSummary {
        elements: count,
        payload_bytes,
        threads,
        end,
    })
}

/// Open the file at `path` and [`load`] from its start.
pub fn load_from_path<T, R, S>(
    vector: &mut AtomicVector<T, R>,
    serde: &S,
    path: impl AsRef<Path>,
    config: &LoadConfig,
) -> Result<LoadSummary, PersistError>
where
    T: Element,
    R: Refcount<T>,
    S: Serde<T> + ?Sized,
{
    let file = File::open(path)?;
    load(vector, serde, &file, config)
}

/// State every decoder thread reads.
struct LoadJob<'a, T: Element, R: Refcount<T>, S: ?Sized> {
    vector: &'a AtomicVector<T, R>,
    serde: &'a S,
    file: &'a File,
    file_len: u64,
    directory: &'a [u64],
    initial_buffer: usize,
    stride: usize,
    abort: AtomicBool,
    end: AtomicU64,
}

impl<T, R, S> LoadJob<'_, T, R, S>
where
    T: Element,
    R: Refcount<T>,
    S: Serde<T> + ?Sized,
{
    /// Run the worker pool; returns total payload bytes or the first
    /// worker error.
    fn run(&self) -> Result<u64, PersistError> {
        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(self.stride);
            let mut first_err = None;
            for tid in 0..self.stride {
                let spawned = thread::Builder::new()
                    .name(format!("ratchet-load-{tid}"))
                    .spawn_scoped(scope, move || self.worker(tid));
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        self.abort.store(true, Ordering::Relaxed);
                        first_err = Some(PersistError::ThreadSpawn {
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }

            let mut total = 0u64;
            for handle in workers {
                match handle.join() {
                    Ok(Ok(bytes)) => total += bytes,
                    Ok(Err(e)) => {
                        first_err.get_or_insert(e);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            match first_err {
                Some(e) => Err(e),
                None => Ok(total),
            }
        })
    }

    fn worker(&self, tid: usize) -> Result<u64, PersistError> {
        let mut buf = Vec::with_capacity(self.initial_buffer);
        let mut bytes = 0u64;
        for index in (tid..self.directory.len()).step_by(self.stride) {
            if self.abort.load(Ordering::Relaxed) {
                return Ok(bytes);
            }
            match self.load_one(tid, index, &mut buf) {
                Ok(len) => bytes += len,
                Err(e) => {
                    self.abort.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }
        tracing::debug!(tid, bytes, "load worker finished");
        Ok(bytes)
    }

    fn load_one(&self, tid: usize, index: usize, buf: &mut Vec<u8>) -> Result<u64, PersistError> {
        let offset = self.directory[index];
        let mut word = [0u8; WORD as usize];
        pread::read_exact_at(self.file, &mut word, offset)?;
        let len = codec::word_from_bytes(word);

        let start = offset + WORD;
        if len > self.file_len - start {
            return Err(PersistError::PayloadOutOfBounds {
                index,
                offset,
                len,
                file_len: self.file_len,
            });
        }
        buf.resize(len as usize, 0);
        pread::read_exact_at(self.file, buf, start)?;

        let value = self.serde.load(buf).map_err(|source| {
            tracing::error!(
                index,
                tid,
                len,
                offset,
                error = %source,
                "could not deserialize element"
            );
            PersistError::Decode { index, source }
        })?;
        // The vector takes its own reference; ours from `load` goes
        // whether or not the write succeeded.
        let written = self.vector.write(index, value);
        self.vector.refcount().dec(value);
        written?;

        if index + 1 == self.directory.len() {
            self.end.store(start + len, Ordering::Release);
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_test_utils::{nz, TrackedRefcount, TrackedSerde};
    use std::io::Write;
    use std::num::NonZeroU32;
    use std::sync::Arc;

    type TrackedVector = AtomicVector<NonZeroU32, Arc<TrackedRefcount>>;

    fn saved(values: &[u32]) -> (Arc<TrackedRefcount>, File) {
        let rc = Arc::new(TrackedRefcount::new(1000));
        let vec = TrackedVector::new(Arc::clone(&rc));
        for &v in values {
            vec.append(nz(v));
        }
        let mut file = tempfile::tempfile().unwrap();
        crate::save(&vec, &TrackedSerde::new(Arc::clone(&rc)), &mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        (rc, file)
    }

    #[test]
    fn load_restores_values_and_refcounts() {
        let values: Vec<u32> = (1..=200).collect();
        let (rc, file) = saved(&values);
        let mut back = TrackedVector::new(Arc::clone(&rc));
        let serde = TrackedSerde::new(Arc::clone(&rc));
        let summary = load(&mut back, &serde, &file, &LoadConfig::with_threads(3)).unwrap();

        assert_eq!(summary.elements, 200);
        assert_eq!(summary.threads, 3);
        assert_eq!(back.len(), 200);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(*back.get(i).unwrap(), nz(v));
            assert_eq!(rc.get(nz(v)), 1);
        }
    }

    #[test]
    fn cursor_left_after_last_entry() {
        let (rc, mut file) = saved(&[1, 2, 3]);
        file.seek(SeekFrom::End(0)).unwrap();
        file.write_all(b"trailer").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let mut back = TrackedVector::new(Arc::clone(&rc));
        let summary = load(&mut back, &TrackedSerde::new(rc), &file, &LoadConfig::default())
            .unwrap();
        let mut cursor = &file;
        assert_eq!(cursor.stream_position().unwrap(), summary.end);
        assert_eq!(file.metadata().unwrap().len(), summary.end + 7);
    }

    #[test]
    fn threads_never_exceed_elements() {
        let (rc, file) = saved(&[4, 5]);
        let mut back = TrackedVector::new(Arc::clone(&rc));
        let summary = load(
            &mut back,
            &TrackedSerde::new(rc),
            &file,
            &LoadConfig::with_threads(64),
        )
        .unwrap();
        assert_eq!(summary.threads, 2);
    }

    #[test]
    fn decode_failure_reports_index_and_aborts() {
        let (rc, file) = saved(&[1, 2, 3, 4]);
        // Rewrite element 2's payload as zero, which TrackedSerde rejects.
        let directory_at = HEADER_LEN;
        let mut entry = [0u8; WORD as usize];
        pread::read_exact_at(&file, &mut entry, directory_at + 2 * WORD).unwrap();
        let offset = codec::word_from_bytes(entry);
        let mut f = &file;
        f.seek(SeekFrom::Start(offset + WORD)).unwrap();
        f.write_all(&[0, 0, 0, 0]).unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();

        let mut back = TrackedVector::new(Arc::clone(&rc));
        let err = load(
            &mut back,
            &TrackedSerde::new(Arc::clone(&rc)),
            &file,
            &LoadConfig::with_threads(1),
        )
        .unwrap_err();
        assert!(matches!(err, PersistError::Decode { index: 2, .. }), "{err}");
        // Single worker stops at the failure: slot 3 is never filled.
        assert_eq!(
            back.read(3),
            Err(ratchet_core::VectorError::EmptySlot { index: 3 })
        );
    }
}
