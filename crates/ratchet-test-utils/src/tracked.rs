//! A refcount policy that records every reference it hands out.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicI64, Ordering};

use ratchet_core::Refcount;

/// Per-value reference counters for small integer elements `1..=max`.
///
/// Every `inc`/`dec` the vector performs lands in a counter, so tests can
/// assert the exact number of live references per value at any point,
/// and that everything is released once the vector is gone. A `dec`
/// below zero panics on the spot.
pub struct TrackedRefcount {
    counts: Box<[AtomicI64]>,
}

impl TrackedRefcount {
    /// Track values `1..=max`.
    pub fn new(max: u32) -> Self {
        Self {
            counts: (0..max).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    fn cell(&self, value: NonZeroU32) -> &AtomicI64 {
        let index = value.get() as usize - 1;
        assert!(
            index < self.counts.len(),
            "value {value} outside tracked range 1..={}",
            self.counts.len()
        );
        &self.counts[index]
    }

    /// Live references to `value`.
    pub fn get(&self, value: NonZeroU32) -> i64 {
        self.cell(value).load(Ordering::SeqCst)
    }

    /// Live references across all values.
    pub fn total(&self) -> i64 {
        self.counts.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// Panic unless every counter is back at zero.
    pub fn assert_clear(&self) {
        for (i, c) in self.counts.iter().enumerate() {
            let n = c.load(Ordering::SeqCst);
            assert_eq!(n, 0, "value {} still holds {n} references", i + 1);
        }
    }
}

impl Refcount<NonZeroU32> for TrackedRefcount {
    fn inc(&self, value: NonZeroU32) {
        self.cell(value).fetch_add(1, Ordering::SeqCst);
    }

    fn dec(&self, value: NonZeroU32) {
        let prev = self.cell(value).fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "refcount underflow on {value}");
    }
}

impl fmt::Debug for TrackedRefcount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedRefcount")
            .field("values", &self.counts.len())
            .field("total", &self.total())
            .finish()
    }
}
