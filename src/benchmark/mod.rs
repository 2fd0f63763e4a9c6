//! Benchmark utilities for the matcher.
//!
//! Provides seeded dataset generation and throughput/accuracy measurement:
//!
//! - **Datasets**: uniform random descriptors (no structure, worst case for
//!   distinctiveness) and planted datasets where every query is a noisy copy
//!   of a known train descriptor.
//! - **Speed**: warm-up plus measured invocations, reported as time per
//!   invocation and comparisons per second.
//! - **Accuracy**: precision and acceptance rate of the margin test against
//!   planted ground truth.
//!
//! Brute force does the same amount of work whatever the data looks like, so
//! uniform random data is a fair throughput benchmark even though real
//! descriptors are far more structured.

pub mod datasets;
pub mod metrics;

pub use datasets::{
    create_benchmark_dataset, create_planted_dataset, random_descriptors, BinaryDataset,
};
pub use metrics::{measure, MatchAccuracy, ThroughputReport};
