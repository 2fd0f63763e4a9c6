//! Synthetic descriptor datasets for benchmarking.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use crate::descriptor::{Descriptor, DescriptorSet, DESCRIPTOR_BITS, DESCRIPTOR_BYTES};

/// A train/query pair of descriptor sets.
#[derive(Debug, Clone)]
pub struct BinaryDataset {
    /// Descriptors matched against.
    pub train: DescriptorSet,
    /// Descriptors looking for a match.
    pub queries: DescriptorSet,
    /// For planted datasets, the train index each query was derived from.
    pub ground_truth: Option<Vec<usize>>,
}

impl BinaryDataset {
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    pub fn n_queries(&self) -> usize {
        self.queries.len()
    }

    /// Distance evaluations performed by one invocation.
    pub fn comparisons(&self) -> u64 {
        self.train.len() as u64 * self.queries.len() as u64
    }

    /// Raw descriptor bytes held by both sets.
    pub fn memory_bytes(&self) -> usize {
        (self.train.len() + self.queries.len()) * DESCRIPTOR_BYTES
    }
}

/// `count` descriptors of uniformly random bytes.
pub fn random_descriptors(count: usize, seed: u64) -> DescriptorSet {
    let mut rng = StdRng::seed_from_u64(seed);
    random_with(&mut rng, count)
}

fn random_with(rng: &mut StdRng, count: usize) -> DescriptorSet {
    (0..count)
        .map(|_| {
            let mut record = [0u8; DESCRIPTOR_BYTES];
            rng.fill(&mut record[..]);
            Descriptor::from_bytes(&record)
        })
        .collect()
}

/// Independent uniform train and query sets.
///
/// Queries have no relation to the train set, so nearly every query is
/// rejected at any useful threshold; this is the throughput workload.
pub fn create_benchmark_dataset(n_train: usize, n_queries: usize, seed: u64) -> BinaryDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let queries = random_with(&mut rng, n_queries);
    let train = random_with(&mut rng, n_train);
    BinaryDataset {
        train,
        queries,
        ground_truth: None,
    }
}

/// Uniform train set plus queries that are noisy copies of train entries.
///
/// Query `i` is `train[ground_truth[i]]` with exactly `flips` distinct bits
/// inverted, so its distance to its source is `flips` while unrelated train
/// descriptors sit around 256 bits away.
///
/// # Panics
///
/// If `n_train == 0` while `n_queries > 0`, or `flips > 512`.
pub fn create_planted_dataset(
    n_train: usize,
    n_queries: usize,
    flips: usize,
    seed: u64,
) -> BinaryDataset {
    assert!(flips <= DESCRIPTOR_BITS, "cannot flip more than 512 bits");
    assert!(n_train > 0 || n_queries == 0, "planted queries need a train set");

    let mut rng = StdRng::seed_from_u64(seed);
    let train = random_with(&mut rng, n_train);

    let mut truth = Vec::with_capacity(n_queries);
    let queries: DescriptorSet = (0..n_queries)
        .map(|_| {
            let source = rng.random_range(0..n_train);
            truth.push(source);
            sample(&mut rng, DESCRIPTOR_BITS, flips)
                .into_iter()
                .fold(train.as_slice()[source], Descriptor::with_bit_flipped)
        })
        .collect();

    BinaryDataset {
        train,
        queries,
        ground_truth: Some(truth),
    }
}
