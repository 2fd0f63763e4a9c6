//! Matching parameters.

use serde::{Deserialize, Serialize};

use crate::distance::{Distance, MAX_DISTANCE};
use crate::error::{MatchError, Result};

/// Default queries per block. Worker-local staging keeps a block this size inline.
pub(crate) const DEFAULT_QUERY_BLOCK: usize = 64;

/// Parameters for [`BruteForceMatcher`](super::BruteForceMatcher).
///
/// Only `threshold` affects results. The other fields choose how the
/// `queries x train` product is partitioned across workers, and any valid
/// choice yields the same output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Minimum bit margin between the best and second-best train distance.
    pub threshold: Distance,
    /// Disjoint train slices swept concurrently for each query block.
    pub train_slices: usize,
    /// Queries staged together and swept as one unit of work.
    pub query_block: usize,
    /// Dedicated worker count. `None` uses the global rayon pool. Requires
    /// `parallel`.
    pub threads: Option<usize>,
    /// Run on worker threads. When `false` each query is swept sequentially.
    pub parallel: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            threshold: 5,
            train_slices: 4,
            query_block: DEFAULT_QUERY_BLOCK,
            threads: None,
            parallel: true,
        }
    }
}

impl MatchParams {
    pub fn new(threshold: Distance) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Single-threaded, one sweep per query, no merges.
    pub fn sequential(threshold: Distance) -> Self {
        Self {
            threshold,
            train_slices: 1,
            query_block: 1,
            threads: None,
            parallel: false,
        }
    }

    pub fn with_threshold(mut self, threshold: Distance) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_train_slices(mut self, train_slices: usize) -> Self {
        self.train_slices = train_slices;
        self
    }

    pub fn with_query_block(mut self, query_block: usize) -> Self {
        self.query_block = query_block;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold > MAX_DISTANCE {
            return Err(MatchError::launch(format!(
                "threshold {} exceeds {MAX_DISTANCE} bits",
                self.threshold
            )));
        }
        if self.train_slices == 0 {
            return Err(MatchError::launch("train_slices must be at least 1"));
        }
        if self.query_block == 0 {
            return Err(MatchError::launch("query_block must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(MatchError::launch("threads must be at least 1"));
        }
        if self.threads.is_some() && !self.parallel {
            return Err(MatchError::launch("threads requires parallel = true"));
        }
        Ok(())
    }
}
