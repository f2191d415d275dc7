//! Fixed-capacity slot arrays and the spine that owns them.
//!
//! A [`Bucket`] is a zero-initialised array of atomic words, allocated
//! once and never resized or moved. The [`BucketTable`] holds one atomic
//! pointer per bucket; racing appenders install buckets by CAS and the
//! losers drop their allocation.
//!
//! This is the only module in the crate that contains `unsafe` code:
//! turning an installed bucket pointer back into a reference.

#![allow(unsafe_code)]

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::index::{bucket_capacity, MAX_BUCKETS};

/// A fixed-capacity array of atomic slots. Zero is the empty sentinel.
///
/// Buckets know nothing about reference counts; releasing the elements
/// they hold is the vector's job.
pub struct Bucket {
    slots: Box<[AtomicUsize]>,
}

impl Bucket {
    /// Allocate a bucket of `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| AtomicUsize::new(0)).collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Load the word in `slot`.
    #[inline]
    pub fn load(&self, slot: usize) -> usize {
        self.slots[slot].load(Ordering::SeqCst)
    }

    /// Compare-and-swap `slot` from `expected` to `desired`.
    ///
    /// May fail spuriously; callers retry.
    #[inline]
    pub fn cmpxchg(&self, slot: usize, expected: usize, desired: usize) -> bool {
        self.slots[slot]
            .compare_exchange_weak(expected, desired, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    /// The atomic behind `slot`, for callers running their own CAS loop.
    #[inline]
    pub fn slot(&self, slot: usize) -> &AtomicUsize {
        &self.slots[slot]
    }
}

/// The spine: one lazily-installed [`Bucket`] per bucket index.
///
/// Once installed, a bucket's address never changes until the table is
/// dropped, so references handed out by [`get`](BucketTable::get) live
/// as long as the borrow of the table.
pub struct BucketTable {
    buckets: [AtomicPtr<Bucket>; MAX_BUCKETS],
}

impl BucketTable {
    /// An empty spine with no buckets allocated.
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
        }
    }

    /// The bucket at `index`, if it has been installed.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Bucket> {
        let raw = self.buckets[index].load(Ordering::Acquire);
        // SAFETY: non-null pointers in the spine come from `Box::into_raw`
        // in `install`/`install_exclusive` and are only freed in `Drop`,
        // which requires `&mut self`. The returned borrow cannot outlive
        // `&self`.
        unsafe { raw.as_ref() }
    }

    /// Race to install bucket `index`.
    ///
    /// Returns the new bucket if this call won the race, or `None` if
    /// another thread installed one first; the caller restarts and picks
    /// up the winner's bucket on its next pass.
    pub fn install(&self, index: usize) -> Option<&Bucket> {
        let capacity = bucket_capacity(index);
        let fresh = Box::into_raw(Box::new(Bucket::new(capacity)));
        match self.buckets[index].compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::trace!(bucket = index, capacity, "installed bucket");
                // SAFETY: `fresh` came from `Box::into_raw` above and is now
                // owned by the spine; see `get`.
                Some(unsafe { &*fresh })
            }
            Err(_) => {
                tracing::trace!(bucket = index, "lost bucket install race");
                // SAFETY: the CAS failed, so `fresh` was never published
                // and this thread still owns it exclusively.
                drop(unsafe { Box::from_raw(fresh) });
                None
            }
        }
    }

    /// Install bucket `index` without racing. Exclusive access makes the
    /// CAS unnecessary; an already-present bucket is kept.
    pub fn install_exclusive(&mut self, index: usize) {
        let slot = self.buckets[index].get_mut();
        if slot.is_null() {
            *slot = Box::into_raw(Box::new(Bucket::new(bucket_capacity(index))));
        }
    }

    /// Number of buckets currently installed.
    pub fn installed(&self) -> usize {
        self.buckets
            .iter()
            .filter(|b| !b.load(Ordering::Acquire).is_null())
            .count()
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BucketTable {
    fn drop(&mut self) {
        for bucket in &mut self.buckets {
            let raw = std::mem::replace(bucket.get_mut(), ptr::null_mut());
            if !raw.is_null() {
                // SAFETY: every non-null pointer was produced by
                // `Box::into_raw` and is dropped exactly once, here.
                drop(unsafe { Box::from_raw(raw) });
            }
        }
    }
}
