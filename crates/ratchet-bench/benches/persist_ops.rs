//! Criterion micro-benchmarks for bulk save and parallel load.

use std::fs::File;
use std::hint::black_box;
use std::io::{Seek, SeekFrom};

use criterion::{criterion_group, criterion_main, Criterion};
use ratchet_bench::{compressible_tensor_vector, tensor_vector};
use ratchet_persist::LoadConfig;
use ratchet_tensor::{TensorCodec, TensorVector};

fn saved(vec: &TensorVector, codec: &TensorCodec) -> File {
    let mut file = tempfile::tempfile().unwrap();
    vec.save(codec, &mut file).unwrap();
    file
}

/// Benchmark: save 1K random 1K-element tensors (below the LZ4 threshold).
fn bench_save_1k_small(c: &mut Criterion) {
    let vec = tensor_vector(1000, 1000, 42);
    let codec = TensorCodec::default();
    c.bench_function("save_1k_tensors_4kb", |b| {
        b.iter(|| black_box(saved(&vec, &codec)));
    });
}

/// Benchmark: save 256 compressible 16K-element tensors (LZ4 path).
fn bench_save_compressed(c: &mut Criterion) {
    let vec = compressible_tensor_vector(256, 16 * 1024);
    let codec = TensorCodec::default();
    c.bench_function("save_256_tensors_64kb_lz4", |b| {
        b.iter(|| black_box(saved(&vec, &codec)));
    });
}

fn bench_load(c: &mut Criterion, name: &str, threads: usize) {
    let vec = tensor_vector(1000, 1000, 7);
    let codec = TensorCodec::default();
    let file = saved(&vec, &codec);
    let config = LoadConfig::with_threads(threads);
    c.bench_function(name, |b| {
        b.iter(|| {
            (&file).seek(SeekFrom::Start(0)).unwrap();
            let mut back = TensorVector::new();
            black_box(back.load(&codec, &file, &config).unwrap());
        });
    });
}

/// Benchmark: load 1K tensors on one thread.
fn bench_load_1_thread(c: &mut Criterion) {
    bench_load(c, "load_1k_tensors_1_thread", 1);
}

/// Benchmark: load 1K tensors on all available threads.
fn bench_load_all_threads(c: &mut Criterion) {
    let threads = LoadConfig::default().resolved_threads();
    bench_load(c, "load_1k_tensors_all_threads", threads);
}

criterion_group!(
    benches,
    bench_save_1k_small,
    bench_save_compressed,
    bench_load_1_thread,
    bench_load_all_threads
);
criterion_main!(benches);
