//! Hamming distance between 512-bit descriptors.
//!
//! `popcount(q XOR t)` summed over the eight words. The word loop has a
//! fixed trip count, so it fully unrolls into eight `xor` + `popcnt` pairs
//! (or a vector popcount where the target has one) with no branches. Build
//! with `-C target-cpu=native` (or at least `+popcnt`) to get the hardware
//! instruction instead of the bit-twiddling fallback.

use crate::descriptor::{Descriptor, DESCRIPTOR_BITS, DESCRIPTOR_WORDS};

/// A Hamming distance, always in `0..=512`.
pub type Distance = u32;

/// Largest possible distance; also the "nothing observed" sentinel.
pub const MAX_DISTANCE: Distance = DESCRIPTOR_BITS as Distance;

/// Number of differing bits between `a` and `b`.
#[inline(always)]
#[must_use]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> Distance {
    let a = a.words();
    let b = b.words();
    let mut acc = 0u32;
    for i in 0..DESCRIPTOR_WORDS {
        acc += (a[i] ^ b[i]).count_ones();
    }
    acc
}

/// Distances from `query` to every descriptor of `train`, in order.
#[must_use]
pub fn hamming_batch(query: &Descriptor, train: &[Descriptor]) -> Vec<Distance> {
    train.iter().map(|t| hamming(query, t)).collect()
}
