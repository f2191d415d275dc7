//! The growable, concurrently accessible, append-only vector.
//!
//! [`AtomicVector`] supports `append`, `read`, and `write` from any number
//! of threads without a lock. Storage is a spine of exponentially sized
//! [`Bucket`](crate::bucket::Bucket)s, so existing slots never move as the
//! vector grows.
//!
//! # Protocol
//!
//! - **append** claims the slot at the current size by CAS from zero, takes
//!   the vector's reference, then bumps `size`. Racing appenders retry
//!   until they win a slot; the winner of slot `s` is the only thread that
//!   can move `size` from `s` to `s + 1`, so `size` always equals the
//!   number of claimed slots.
//! - **read** loads the slot and takes a reference for the caller while
//!   inside the sensitive section.
//! - **write** swaps the new value in by CAS, then waits for the
//!   sensitive section to drain before releasing the old value. Readers
//!   that loaded the old value have taken their reference by then;
//!   readers arriving later see the new value.

use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};

use ratchet_core::{Element, Refcount, VectorError};

use crate::bucket::{Bucket, BucketTable};
use crate::config::{ConfigError, ValidatedConfig, VectorConfig};
use crate::index::{self, MAX_BUCKETS, MAX_LEN};
use crate::section::SensitiveSection;

/// A growable vector with lock-free concurrent append, read, and write.
///
/// The vector holds exactly one reference (through `R`) to every element
/// it stores. Elements handed out by [`read`](AtomicVector::read) carry
/// their own reference, which the caller must release (or use
/// [`get`](AtomicVector::get), which releases on drop).
///
/// Size only grows. There is no removal.
pub struct AtomicVector<T: Element, R: Refcount<T>> {
    buckets: BucketTable,
    size: AtomicU32,
    section: SensitiveSection,
    refcount: R,
    _element: PhantomData<T>,
}

impl<T: Element, R: Refcount<T>> AtomicVector<T, R> {
    /// Create an empty vector with the default configuration.
    pub fn new(refcount: R) -> Self {
        Self::build(refcount, VectorConfig::DEFAULT_SECTION_SLOTS)
    }

    /// Create an empty vector, validating `config` first.
    pub fn with_config(refcount: R, config: &VectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(refcount, config.section_slots))
    }

    /// Create an empty vector from an already validated configuration.
    pub fn with_validated(refcount: R, config: &ValidatedConfig) -> Self {
        Self::build(refcount, config.get().section_slots)
    }

    fn build(refcount: R, section_slots: usize) -> Self {
        Self {
            buckets: BucketTable::new(),
            size: AtomicU32::new(0),
            section: SensitiveSection::new(section_slots),
            refcount,
            _element: PhantomData,
        }
    }

    /// Append `value` as the new last element and return its index.
    ///
    /// The vector takes its own reference to `value`; the caller's
    /// reference is untouched.
    ///
    /// # Panics
    ///
    /// Panics if the vector already holds [`MAX_LEN`] elements.
    pub fn append(&self, value: T) -> usize {
        let word = value.into_word().get();
        loop {
            let at = self.size.load(Ordering::Acquire);
            assert!(
                (at as usize) < MAX_LEN,
                "vector index space exhausted at {MAX_LEN} elements"
            );
            let (bucket_index, offset) = index::locate(at);
            let bucket = match self.buckets.get(bucket_index) {
                Some(bucket) => bucket,
                None => match self.buckets.install(bucket_index) {
                    Some(bucket) => bucket,
                    None => continue,
                },
            };

            // Slot `at` is not yet covered by `size`, so `write` cannot
            // touch it. Other appenders can: whoever moves it off zero
            // first owns it, and the rest go around again.
            if !bucket.cmpxchg(offset, 0, word) {
                continue;
            }
            self.refcount.inc(value);

            // Only the owner of slot `at` publishes it, so nobody else
            // can have advanced `size` past `at` in the meantime.
            debug_assert_eq!(self.size.load(Ordering::Relaxed), at);
            self.size.fetch_add(1, Ordering::Release);
            return at as usize;
        }
    }

    /// Read the element at `index`, taking a reference for the caller.
    ///
    /// The caller owns the returned reference and must release it
    /// through the vector's refcount policy.
    pub fn read(&self, index: usize) -> Result<T, VectorError> {
        let (bucket, offset) = self.published(index, |size| VectorError::ReadPastEnd {
            index,
            size,
        })?;
        let _guard = self.section.enter();
        let word = NonZeroUsize::new(bucket.load(offset)).ok_or(VectorError::EmptySlot { index })?;
        let value = T::from_word(word);
        self.refcount.inc(value);
        Ok(value)
    }

    /// Read the element at `index` into a guard that releases the read
    /// reference when dropped.
    pub fn get(&self, index: usize) -> Result<Held<'_, T, R>, VectorError> {
        let value = self.read(index)?;
        Ok(Held {
            value,
            refcount: &self.refcount,
        })
    }

    /// Overwrite the element at `index` with `value`.
    ///
    /// Only existing slots can be written; growing goes through
    /// [`append`](AtomicVector::append). The vector takes its own
    /// reference to `value` and releases the one it held on the previous
    /// element, after every reader that might have loaded it is done.
    pub fn write(&self, index: usize, value: T) -> Result<(), VectorError> {
        let (bucket, offset) = self.published(index, |size| VectorError::WritePastEnd {
            index,
            size,
        })?;
        self.refcount.inc(value);

        let slot = bucket.slot(offset);
        let word = value.into_word().get();
        let old = loop {
            let old = slot.load(Ordering::SeqCst);
            if slot
                .compare_exchange_weak(old, word, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                break old;
            }
        };

        if let Some(old) = NonZeroUsize::new(old) {
            self.section.wait();
            self.refcount.dec(T::from_word(old));
        }
        Ok(())
    }

    /// Number of published elements. Never decreases.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire) as usize
    }

    /// Whether no element has been published yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of the sensitive section readers enter.
    pub fn section_slots(&self) -> usize {
        self.section.width()
    }

    /// Number of buckets allocated so far.
    pub fn bucket_count(&self) -> usize {
        self.buckets.installed()
    }

    /// The refcount policy this vector manages its elements with.
    pub fn refcount(&self) -> &R {
        &self.refcount
    }

    /// Racy check that no reader is mid-read. Assertions only.
    pub fn appears_quiescent(&self) -> bool {
        self.section.appears_free()
    }

    /// Pre-size an empty vector to exactly `len` slots for bulk loading.
    ///
    /// Installs every bucket the slots need and publishes `size = len` in
    /// one step, leaving the slots empty. Exclusive access guarantees no
    /// concurrent operation observes the half-built state; every slot
    /// must then be filled with [`write`](AtomicVector::write). Reading a
    /// slot that was never filled reports [`VectorError::EmptySlot`].
    pub fn grow_for_load(&mut self, len: usize) -> Result<(), VectorError> {
        let size = *self.size.get_mut() as usize;
        if size != 0 {
            return Err(VectorError::NotEmpty { size });
        }
        if len > MAX_LEN {
            return Err(VectorError::CapacityExhausted { requested: len });
        }
        if len == 0 {
            return Ok(());
        }
        let last_bucket = index::bucket_of((len - 1) as u32);
        for bucket in 0..=last_bucket {
            self.buckets.install_exclusive(bucket);
        }
        *self.size.get_mut() = len as u32;
        tracing::debug!(len, buckets = last_bucket + 1, "grew vector for bulk load");
        Ok(())
    }

    /// Resolve a published index to its bucket and offset, or report
    /// the bounds error built by `past_end`.
    fn published(
        &self,
        index: usize,
        past_end: impl FnOnce(usize) -> VectorError,
    ) -> Result<(&Bucket, usize), VectorError> {
        let size = self.len();
        if index >= size {
            return Err(past_end(size));
        }
        let (bucket_index, offset) = index::locate(index as u32);
        let bucket = self
            .buckets
            .get(bucket_index)
            .ok_or(VectorError::EmptySlot { index })?;
        Ok((bucket, offset))
    }
}

impl<T: Element, R: Refcount<T>> Drop for AtomicVector<T, R> {
    fn drop(&mut self) {
        // Exclusive access: nobody can still be reading, so release the
        // vector's references directly instead of going through `read`.
        debug_assert!(
            self.section.appears_free(),
            "AtomicVector dropped while a reader was inside its sensitive section"
        );
        let size = *self.size.get_mut() as usize;
        for bucket_index in 0..MAX_BUCKETS {
            let start = index::bucket_start(bucket_index) as usize;
            if start >= size {
                break;
            }
            let Some(bucket) = self.buckets.get(bucket_index) else {
                continue;
            };
            let live = bucket.capacity().min(size - start);
            for offset in 0..live {
                if let Some(word) = NonZeroUsize::new(bucket.load(offset)) {
                    self.refcount.dec(T::from_word(word));
                }
            }
        }
    }
}

impl<T: Element, R: Refcount<T>> fmt::Debug for AtomicVector<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicVector")
            .field("len", &self.len())
            .field("buckets", &self.bucket_count())
            .field("section", &self.section)
            .finish()
    }
}

/// A read reference to a vector element, released on drop.
pub struct Held<'a, T: Element, R: Refcount<T>> {
    value: T,
    refcount: &'a R,
}

impl<T: Element, R: Refcount<T>> Held<'_, T, R> {
    /// The element.
    pub fn value(&self) -> T {
        self.value
    }

    /// Keep the reference: the caller becomes responsible for releasing it.
    pub fn into_owned(self) -> T {
        ManuallyDrop::new(self).value
    }
}

impl<T: Element, R: Refcount<T>> Deref for Held<'_, T, R> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Element, R: Refcount<T>> Drop for Held<'_, T, R> {
    fn drop(&mut self) {
        self.refcount.dec(self.value);
    }
}

impl<T: Element + fmt::Debug, R: Refcount<T>> fmt::Debug for Held<'_, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Held").field(&self.value).finish()
    }
}
