//! Benchmark fixtures for Ratchet vectors.
//!
//! - [`int_vector`]: plain integer vector, no refcount overhead
//! - [`tensor_vector`]: seeded random `f32` tensors behind `Arc`

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::num::NonZeroUsize;
use std::sync::Arc;

use ratchet_core::NoopRefcount;
use ratchet_tensor::{Tensor, TensorVector};
use ratchet_test_utils::{random_f32, seeded_rng};
use ratchet_vector::AtomicVector;

/// Integer vector type used by the benchmarks.
pub type IntVector = AtomicVector<NonZeroUsize, NoopRefcount>;

/// An integer vector holding `1..=n`.
pub fn int_vector(n: usize) -> IntVector {
    let vec = IntVector::new(NoopRefcount);
    for i in 1..=n {
        vec.append(NonZeroUsize::MIN.saturating_add(i - 1));
    }
    vec
}

/// A vector of `n` seeded random `f32` tensors of `elements` values each.
pub fn tensor_vector(n: usize, elements: usize, seed: u64) -> TensorVector {
    let mut rng = seeded_rng(seed);
    let vec = TensorVector::new();
    for _ in 0..n {
        vec.append(&flat_tensor(random_f32(&mut rng, elements)));
    }
    vec
}

/// Like [`tensor_vector`], but with low-entropy values that LZ4 compresses well.
pub fn compressible_tensor_vector(n: usize, elements: usize) -> TensorVector {
    let vec = TensorVector::new();
    for i in 0..n {
        let data = (0..elements).map(|j| ((i + j) % 8) as f32).collect();
        vec.append(&flat_tensor(data));
    }
    vec
}

/// A rank-1 tensor over `data`. Panics on construction failure so a
/// fixture never silently comes out short.
fn flat_tensor(data: Vec<f32>) -> Arc<Tensor> {
    match Tensor::from_f32(&[data.len()], data) {
        Ok(t) => Arc::new(t),
        Err(e) => panic!("benchmark tensor: {e}"),
    }
}
