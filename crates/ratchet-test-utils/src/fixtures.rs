//! Small-integer fixtures, thread fan-out, and seeded random payloads.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ratchet_core::{Refcount, Serde, SerdeError};

use crate::tracked::TrackedRefcount;

/// Shorthand for a non-zero test value. Panics on zero.
pub fn nz(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).expect("test values are non-zero")
}

/// Serde for `NonZeroU32` as 4 little-endian bytes.
///
/// `load` takes a reference through the shared [`TrackedRefcount`], as a
/// real buffer allocator would, so persistence round trips can be checked
/// for leaks.
#[derive(Clone, Debug)]
pub struct TrackedSerde {
    refcount: Arc<TrackedRefcount>,
}

impl TrackedSerde {
    pub fn new(refcount: Arc<TrackedRefcount>) -> Self {
        Self { refcount }
    }
}

impl Serde<NonZeroU32> for TrackedSerde {
    fn save(&self, value: NonZeroU32, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        out.extend_from_slice(&value.get().to_le_bytes());
        Ok(())
    }

    fn load(&self, bytes: &[u8]) -> Result<NonZeroU32, SerdeError> {
        let raw: [u8; 4] = bytes.try_into().map_err(|_| SerdeError::Truncated {
            needed: 4,
            available: bytes.len(),
        })?;
        let value = NonZeroU32::new(u32::from_le_bytes(raw)).ok_or(SerdeError::Invalid {
            detail: "zero element".into(),
        })?;
        self.refcount.inc(value);
        Ok(value)
    }
}

/// Number of hardware threads, at least one.
pub fn cpu_count() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Run `f(tid)` on `threads` scoped threads and wait for all of them.
///
/// A panic on any thread is re-raised once all have finished.
pub fn run_on_threads<F>(threads: usize, f: F)
where
    F: Fn(usize) + Sync,
{
    thread::scope(|s| {
        for tid in 0..threads {
            let f = &f;
            s.spawn(move || f(tid));
        }
    });
}

/// Run `f(tid)` once per hardware thread; returns the thread count.
pub fn run_on_all_cpus<F>(f: F) -> usize
where
    F: Fn(usize) + Sync,
{
    let n = cpu_count();
    run_on_threads(n, f);
    n
}

/// Deterministic RNG for reproducible payloads.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A random shape of rank `1..=max_rank` with dimensions `1..=max_dim`.
pub fn random_shape(rng: &mut impl Rng, max_rank: usize, max_dim: usize) -> Vec<usize> {
    let rank = rng.random_range(1..=max_rank);
    (0..rank).map(|_| rng.random_range(1..=max_dim)).collect()
}

/// `n` uniform floats in `[-1, 1)`.
pub fn random_f32(rng: &mut impl Rng, n: usize) -> Vec<f32> {
    (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// `n` uniform doubles in `[-1, 1)`.
pub fn random_f64(rng: &mut impl Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
}
