//! hamming2nn: brute-force 2-NN matching for 512-bit binary descriptors.
//!
//! For every query descriptor, find the nearest train descriptor by Hamming
//! distance and accept it only if the second-nearest is at least `threshold`
//! bits further away. Binary descriptors (ORB, BRISK, LATCH, ...) live in
//! Hamming space, so the distinctiveness test is an absolute bit margin rather
//! than Lowe's distance ratio.
//!
//! - `descriptor`: fixed-width descriptors, descriptor sets, query/train views
//! - `distance`: XOR + popcount kernel
//! - `top_two`: best/second-best tracking and its merge
//! - `decide`: margin test and match results
//! - `matcher/`: parallel orchestration over the full `queries x train` product
//! - `benchmark/`: seeded datasets and throughput measurement
//!
//! # Example
//!
//! ```rust
//! use hamming2nn::{match_descriptors, Descriptor, DescriptorSet};
//!
//! # fn main() -> hamming2nn::Result<()> {
//! // Train descriptors at distance 2, 5 and 11 from the query.
//! let train: DescriptorSet = [2, 5, 11].into_iter().map(Descriptor::with_low_bits).collect();
//! let queries = DescriptorSet::new(vec![Descriptor::ZERO]);
//!
//! // Margin 3: accepted at threshold 3, rejected at 5.
//! assert_eq!(match_descriptors(&train, &queries, 3)?[0].index(), Some(0));
//! assert_eq!(match_descriptors(&train, &queries, 5)?[0].index(), None);
//! # Ok(())
//! # }
//! ```
//!
//! # Critical Nuances
//!
//! ## Ties are ambiguous
//!
//! Two train descriptors at the same minimal distance give a margin of zero,
//! so any positive threshold rejects the query. Equal distances are never
//! collapsed into one candidate.
//!
//! ## Determinism
//!
//! Results depend only on `(train, queries, threshold)`. Partitioning and
//! thread count change how fast the answer arrives, never the answer; when two
//! train descriptors tie for nearest, the lower index is reported.

pub mod benchmark;
pub mod decide;
pub mod descriptor;
pub mod distance;
pub mod error;
pub mod matcher;
pub mod top_two;

// Re-exports
pub use decide::{collect_matches, decide, Match, MatchResult};
pub use descriptor::{
    CachedView, Descriptor, DescriptorSet, LinearView, DESCRIPTOR_BITS, DESCRIPTOR_BYTES,
    DESCRIPTOR_WORDS,
};
pub use distance::{hamming, hamming_batch, Distance, MAX_DISTANCE};
pub use error::{MatchError, Result};
pub use matcher::{match_descriptors, BruteForceMatcher, MatchParams};
pub use top_two::{Candidate, TopTwo};
