//! Test utilities for Ratchet development.
//!
//! Provides a leak-checking [`TrackedRefcount`], a matching
//! [`TrackedSerde`] for persistence tests, thread fan-out helpers, and
//! seeded random payload generators.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod tracked;

pub use fixtures::{
    cpu_count, nz, random_f32, random_f64, random_shape, run_on_all_cpus, run_on_threads,
    seeded_rng, TrackedSerde,
};
pub use tracked::TrackedRefcount;
