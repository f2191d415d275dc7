//! Mapping from global slot indices to (bucket, offset) pairs.
//!
//! Bucket `b` holds `2^b` slots and covers global indices
//! `[2^b - 1, 2^(b+1) - 1)`. Each bucket doubles the previous one, so a
//! 32-bit size counter needs at most [`MAX_BUCKETS`] buckets.

/// Number of bucket pointers on the spine.
pub const MAX_BUCKETS: usize = 32;

/// Largest number of elements a vector can hold (`u32::MAX`).
///
/// Indices run from `0` to `MAX_LEN - 1`; index `MAX_LEN - 1` lands in the
/// last slot of bucket 31.
pub const MAX_LEN: usize = u32::MAX as usize;

/// Bucket holding global index `index`: `floor(log2(index + 1))`.
#[inline]
pub fn bucket_of(index: u32) -> usize {
    let n = index as u64 + 1;
    (63 - n.leading_zeros()) as usize
}

/// First global index stored in `bucket`.
#[inline]
pub fn bucket_start(bucket: usize) -> u32 {
    debug_assert!(bucket < MAX_BUCKETS);
    ((1u64 << bucket) - 1) as u32
}

/// Number of slots in `bucket`.
#[inline]
pub fn bucket_capacity(bucket: usize) -> usize {
    debug_assert!(bucket < MAX_BUCKETS);
    1usize << bucket
}

/// Split a global index into `(bucket, offset within bucket)`.
#[inline]
pub fn locate(index: u32) -> (usize, usize) {
    let bucket = bucket_of(index);
    let start = bucket_start(bucket);
    debug_assert!(index >= start);
    debug_assert!(((index - start) as usize) < bucket_capacity(bucket));
    (bucket, (index - start) as usize)
}
