//! Sensitive sections: quiescence detection without mutual exclusion.
//!
//! A [`SensitiveSection`] is a region of code many threads may occupy at
//! once. Any thread can [`wait`](SensitiveSection::wait) until every
//! thread has been observed outside the region at least once. That is
//! enough to defer reclamation: a writer that has already unlinked an old
//! value waits out the readers that might have loaded it before freeing.
//!
//! This is not a lock. Nothing stops new threads from entering after a
//! wait has passed them, and waiters get no fairness: entering threads
//! always win.

use std::hint::spin_loop;
use std::sync::atomic::{AtomicU32, Ordering};

thread_local! {
    // Only the address matters: it is unique per live thread.
    static IDENTITY: u8 = const { 0 };
}

/// 64-bit golden-ratio multiplier for Fibonacci hashing.
const HASH_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Per-thread-hashed occupancy counters.
///
/// Each thread maps onto one of `width` counters by a multiplicative hash
/// of its identity. Threads that collide share a counter; a waiter may
/// then spin longer than it needs to. Counters are not cache-line padded.
pub struct SensitiveSection {
    counts: Box<[AtomicU32]>,
    mask: usize,
}

// Compile-time assertion: SensitiveSection must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SensitiveSection>();
};

impl SensitiveSection {
    /// Create a section with `width` counters.
    ///
    /// # Panics
    ///
    /// Panics if `width` is not a power of two. [`VectorConfig::validate`]
    /// rejects such widths before they get here.
    ///
    /// [`VectorConfig::validate`]: crate::config::VectorConfig::validate
    pub fn new(width: usize) -> Self {
        assert!(
            width.is_power_of_two(),
            "SensitiveSection width must be a power of two, got {width}"
        );
        let counts = (0..width).map(|_| AtomicU32::new(0)).collect();
        Self {
            counts,
            mask: width - 1,
        }
    }

    /// Number of counters.
    pub fn width(&self) -> usize {
        self.counts.len()
    }

    /// Mark the calling thread as inside the section until the guard drops.
    pub fn enter(&self) -> SectionGuard<'_> {
        let count = &self.counts[self.slot_for_current_thread()];
        count.fetch_add(1, Ordering::SeqCst);
        SectionGuard { count }
    }

    /// Spin until every counter has been observed at zero at least once.
    pub fn wait(&self) {
        for count in self.counts.iter() {
            while count.load(Ordering::SeqCst) != 0 {
                spin_loop();
            }
        }
    }

    /// Racy check that no thread is currently inside. Assertions only.
    pub fn appears_free(&self) -> bool {
        self.counts.iter().all(|c| c.load(Ordering::Acquire) == 0)
    }

    fn slot_for_current_thread(&self) -> usize {
        let identity = IDENTITY.with(|b| b as *const u8 as usize);
        let hashed = (identity as u64).wrapping_mul(HASH_MULTIPLIER);
        // The high half carries the mixed bits; the low bits of an
        // aligned address are mostly zero.
        ((hashed >> 32) as usize) & self.mask
    }
}

impl std::fmt::Debug for SensitiveSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensitiveSection")
            .field("width", &self.width())
            .field("appears_free", &self.appears_free())
            .finish()
    }
}

/// RAII occupancy of a [`SensitiveSection`]; leaves on drop.
#[must_use = "the section is left as soon as the guard is dropped"]
pub struct SectionGuard<'a> {
    count: &'a AtomicU32,
}

impl Drop for SectionGuard<'_> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Release);
    }
}
