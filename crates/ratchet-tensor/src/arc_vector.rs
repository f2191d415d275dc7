//! Vectors of `Arc`-shared buffers.
//!
//! An [`ArcVector<X>`] stores each element as the raw pointer behind an
//! `Arc<X>` and maps the vector's `inc`/`dec` onto the `Arc` strong
//! count, so a buffer stays alive exactly as long as some slot or some
//! reader still refers to it. Values cross the boundary only as
//! `Arc<X>`: the raw handle type and its refcount policy are private to
//! this module, so safe code cannot forge a handle or release a
//! reference it does not own.
//!
//! ```
//! use std::sync::Arc;
//! use ratchet_tensor::ArcVector;
//!
//! let vec = ArcVector::new();
//! let name = Arc::new(String::from("weights"));
//! assert_eq!(vec.append(&name), 0);
//! assert_eq!(Arc::strong_count(&name), 2);
//! assert!(Arc::ptr_eq(&vec.read(0).unwrap(), &name));
//! ```
//!
//! The raw handle and the refcount policy are not reachable:
//!
//! ```compile_fail
//! use ratchet_tensor::arc_vector::ArcRefcount;
//! ```
//!
//! ```compile_fail
//! use ratchet_tensor::arc_vector::Shared;
//! ```
//!
//! ```compile_fail
//! let vec = ratchet_tensor::ArcVector::<String>::new();
//! let raw = &vec.inner;
//! ```
//!
//! This is the only module in the crate that contains `unsafe` code.

#![allow(unsafe_code)]

use std::fmt;
use std::fs::File;
use std::io::{Seek, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use ratchet_core::{Element, Refcount, Serde, SerdeError, VectorError};
use ratchet_persist::{LoadConfig, LoadSummary, PersistError, SaveSummary};
use ratchet_vector::{AtomicVector, ConfigError, ValidatedConfig, VectorConfig};

/// A raw, `Copy` handle to the payload of an `Arc<X>`.
///
/// Only meaningful while a strong reference backs it. Every handle in
/// this module comes from a live `Arc` or from the vector protocol.
struct Shared<X> {
    ptr: NonNull<X>,
}

impl<X> Shared<X> {
    /// A handle to `arc`'s payload. Takes no reference.
    fn of(arc: &Arc<X>) -> Self {
        // SAFETY: `Arc::as_ptr` never returns null.
        let ptr = unsafe { NonNull::new_unchecked(Arc::as_ptr(arc).cast_mut()) };
        Self { ptr }
    }

    /// Move `arc`'s reference into a handle.
    fn into_handle(arc: Arc<X>) -> Self {
        // SAFETY: `Arc::into_raw` never returns null.
        let ptr = unsafe { NonNull::new_unchecked(Arc::into_raw(arc).cast_mut()) };
        Self { ptr }
    }

    /// Turn one reference held through this handle back into an `Arc`.
    ///
    /// # Safety
    ///
    /// The caller must own a strong reference to the payload and gives it
    /// up to the returned `Arc`.
    unsafe fn into_arc(self) -> Arc<X> {
        // SAFETY: per the caller contract, a strong reference backs `ptr`.
        unsafe { Arc::from_raw(self.ptr.as_ptr()) }
    }

    /// Borrow the payload.
    ///
    /// # Safety
    ///
    /// Some strong reference to the payload must stay alive for `'a`.
    unsafe fn as_ref<'a>(&self) -> &'a X {
        // SAFETY: per the caller contract the allocation outlives `'a`.
        unsafe { &*self.ptr.as_ptr() }
    }
}

impl<X> Clone for Shared<X> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<X> Copy for Shared<X> {}

impl<X> PartialEq for Shared<X> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<X> Eq for Shared<X> {}

impl<X> fmt::Debug for Shared<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&self.ptr).finish()
    }
}

// SAFETY: a handle is only dereferenced as `&X` while a strong reference
// exists, which is what `Arc<X>: Send + Sync` requires of `X`.
unsafe impl<X: Send + Sync> Send for Shared<X> {}
// SAFETY: as above.
unsafe impl<X: Send + Sync> Sync for Shared<X> {}

impl<X: Send + Sync + 'static> Element for Shared<X> {
    fn into_word(self) -> NonZeroUsize {
        NonZeroUsize::new(self.ptr.as_ptr().expose_provenance()).unwrap_or(NonZeroUsize::MIN)
    }

    fn from_word(word: NonZeroUsize) -> Self {
        // SAFETY: a non-zero address yields a non-null pointer.
        let ptr = unsafe { NonNull::new_unchecked(ptr::with_exposed_provenance_mut(word.get())) };
        Self { ptr }
    }
}

/// [`Refcount`] policy over the `Arc` strong count.
#[derive(Clone, Copy, Debug, Default)]
struct ArcRefcount;

impl<X: Send + Sync + 'static> Refcount<Shared<X>> for ArcRefcount {
    fn inc(&self, value: Shared<X>) {
        // SAFETY: the vector only increments handles it holds or has just
        // been given, so a strong reference is live.
        unsafe { Arc::increment_strong_count(value.ptr.as_ptr()) }
    }

    fn dec(&self, value: Shared<X>) {
        // SAFETY: every `dec` releases a reference taken by a matching
        // `inc` or transferred in by `Serde::load`.
        unsafe { Arc::decrement_strong_count(value.ptr.as_ptr()) }
    }
}

/// Byte encoding for the payload of an [`ArcVector`].
pub trait BufferCodec<X>: Send + Sync {
    /// Append the encoding of `value` to `out`.
    fn encode(&self, value: &X, out: &mut Vec<u8>) -> Result<(), SerdeError>;

    /// Decode a payload.
    fn decode(&self, bytes: &[u8]) -> Result<X, SerdeError>;
}

/// Adapts a [`BufferCodec<X>`] into a [`Serde`] policy for `Shared<X>`.
///
/// `load` allocates a fresh `Arc` and returns its handle carrying that
/// single reference, which the loader releases once the vector holds
/// its own.
struct SharedSerde<'a, C: ?Sized> {
    codec: &'a C,
}

impl<X, C> Serde<Shared<X>> for SharedSerde<'_, C>
where
    X: Send + Sync + 'static,
    C: BufferCodec<X> + ?Sized,
{
    fn save(&self, value: Shared<X>, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        // SAFETY: the saver holds a read reference for the duration.
        let payload = unsafe { value.as_ref() };
        self.codec.encode(payload, out)
    }

    fn load(&self, bytes: &[u8]) -> Result<Shared<X>, SerdeError> {
        let payload = self.codec.decode(bytes)?;
        Ok(Shared::into_handle(Arc::new(payload)))
    }
}

/// A concurrent append-only vector of `Arc<X>`.
///
/// Holds one strong reference to every stored buffer. [`read`] hands out
/// an owned `Arc`; [`write`] swaps in a new buffer and releases the old
/// one once no reader can still be using it.
///
/// [`read`]: ArcVector::read
/// [`write`]: ArcVector::write
pub struct ArcVector<X: Send + Sync + 'static> {
    inner: AtomicVector<Shared<X>, ArcRefcount>,
}

impl<X: Send + Sync + 'static> ArcVector<X> {
    /// Create an empty vector with the default configuration.
    pub fn new() -> Self {
        Self {
            inner: AtomicVector::new(ArcRefcount),
        }
    }

    /// Create an empty vector, validating `config` first.
    pub fn with_config(config: &VectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: AtomicVector::with_config(ArcRefcount, config)?,
        })
    }

    /// Create an empty vector from an already validated configuration.
    pub fn with_validated(config: &ValidatedConfig) -> Self {
        Self {
            inner: AtomicVector::with_validated(ArcRefcount, config),
        }
    }

    /// Append a new reference to `value`; returns its index.
    pub fn append(&self, value: &Arc<X>) -> usize {
        self.inner.append(Shared::of(value))
    }

    /// Read the element at `index` as an owned `Arc`.
    pub fn read(&self, index: usize) -> Result<Arc<X>, VectorError> {
        let handle = self.inner.read(index)?;
        // SAFETY: `read` took a reference on our behalf.
        Ok(unsafe { handle.into_arc() })
    }

    /// Replace the element at `index` with a new reference to `value`.
    pub fn write(&self, index: usize, value: &Arc<X>) -> Result<(), VectorError> {
        self.inner.write(index, Shared::of(value))
    }

    /// Number of published elements.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of buckets allocated so far.
    pub fn bucket_count(&self) -> usize {
        self.inner.bucket_count()
    }

    /// Width of the sensitive section readers enter.
    pub fn section_slots(&self) -> usize {
        self.inner.section_slots()
    }

    /// [`save`](ratchet_persist::save) every element to `out`, encoding
    /// payloads with `codec`.
    pub fn save<C, W>(&self, codec: &C, out: &mut W) -> Result<SaveSummary, PersistError>
    where
        C: BufferCodec<X> + ?Sized,
        W: Write + Seek,
    {
        ratchet_persist::save(&self.inner, &SharedSerde { codec }, out)
    }

    /// [`save_to_path`](ratchet_persist::save_to_path) with `codec`.
    pub fn save_to_path<C>(
        &self,
        codec: &C,
        path: impl AsRef<Path>,
    ) -> Result<SaveSummary, PersistError>
    where
        C: BufferCodec<X> + ?Sized,
    {
        ratchet_persist::save_to_path(&self.inner, &SharedSerde { codec }, path)
    }

    /// [`load`](ratchet_persist::load) into this empty vector, decoding
    /// payloads with `codec`.
    pub fn load<C>(
        &mut self,
        codec: &C,
        file: &File,
        config: &LoadConfig,
    ) -> Result<LoadSummary, PersistError>
    where
        C: BufferCodec<X> + ?Sized,
    {
        ratchet_persist::load(&mut self.inner, &SharedSerde { codec }, file, config)
    }

    /// [`load_from_path`](ratchet_persist::load_from_path) with `codec`.
    pub fn load_from_path<C>(
        &mut self,
        codec: &C,
        path: impl AsRef<Path>,
        config: &LoadConfig,
    ) -> Result<LoadSummary, PersistError>
    where
        C: BufferCodec<X> + ?Sized,
    {
        ratchet_persist::load_from_path(&mut self.inner, &SharedSerde { codec }, path, config)
    }
}

impl<X: Send + Sync + 'static> Default for ArcVector<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: Send + Sync + 'static> fmt::Debug for ArcVector<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArcVector").field(&self.inner).finish()
    }
}
