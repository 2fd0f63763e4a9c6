//! Brute-force 2-NN matching of a query set against a train set.
//!
//! # Work decomposition
//!
//! ```text
//!                    train slices (disjoint, contiguous)
//!                 ┌──────────┬──────────┬──────────┐
//!  query block 0  │ TopTwo[] │ TopTwo[] │ TopTwo[] │ ──merge──► decide ──► out[0..B]
//!                 ├──────────┼──────────┼──────────┤
//!  query block 1  │ TopTwo[] │ TopTwo[] │ TopTwo[] │ ──merge──► decide ──► out[B..2B]
//!                 └──────────┴──────────┴──────────┘
//! ```
//!
//! Each block of queries is staged into worker-local storage once. Every
//! slice task streams its part of the train set through the staged block,
//! producing one partial [`TopTwo`] per query. The partials are reduced with
//! [`TopTwo::merge`] and the task owning the block writes its output slots,
//! so each slot is written exactly once and no locks are needed.
//!
//! Because the merge is associative and commutative, the output does not
//! depend on `train_slices`, `query_block`, the worker count, or scheduling.
//! With `parallel` off (or the `parallel` feature disabled) each query is one
//! in-order sweep and no merge happens.
//!
//! # Faults
//!
//! Invocations are synchronous and report failures through their `Result`.
//! A panic inside a worker is caught at the invocation boundary and returned
//! as [`MatchError::Compute`]; the output buffer is then undefined.
//!
//! # Usage
//!
//! ```rust
//! use hamming2nn::{BruteForceMatcher, Descriptor, DescriptorSet, MatchParams};
//!
//! # fn main() -> hamming2nn::Result<()> {
//! let train: DescriptorSet = [2, 10, 11].into_iter().map(Descriptor::with_low_bits).collect();
//! let queries = DescriptorSet::new(vec![Descriptor::ZERO]);
//!
//! let matcher = BruteForceMatcher::new(MatchParams::new(5))?;
//! let results = matcher.match_sets(&train, &queries)?;
//! assert_eq!(results[0].index(), Some(0));
//! # Ok(())
//! # }
//! ```

mod params;

pub use params::MatchParams;

#[cfg(feature = "parallel")]
use params::DEFAULT_QUERY_BLOCK;

use std::panic::{self, AssertUnwindSafe};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::decide::{decide, MatchResult};
use crate::descriptor::{CachedView, DescriptorSet, LinearView};
use crate::distance::Distance;
use crate::error::{MatchError, Result};
use crate::top_two::TopTwo;
#[cfg(feature = "parallel")]
use crate::{descriptor::Descriptor, distance::hamming, top_two::merge_slots, top_two::Candidate};

/// Queries kept inline (on the worker's stack) when a block is staged.
#[cfg(feature = "parallel")]
const INLINE_QUERIES: usize = DEFAULT_QUERY_BLOCK;

#[cfg(feature = "parallel")]
type StagedQueries = SmallVec<[Descriptor; INLINE_QUERIES]>;

/// Exhaustive matcher with a margin test.
///
/// Holds no per-invocation state, so one matcher can serve any number of
/// invocations (including concurrent ones) and repeated invocations on the
/// same inputs return identical results.
#[derive(Debug)]
pub struct BruteForceMatcher {
    params: MatchParams,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl BruteForceMatcher {
    /// Validate `params` and, if `threads` is set, build a dedicated pool.
    pub fn new(params: MatchParams) -> Result<Self> {
        params.validate()?;

        #[cfg(not(feature = "parallel"))]
        if let Some(threads) = params.threads {
            warn!(threads, "built without the `parallel` feature, sweeping on the calling thread");
        }

        #[cfg(feature = "parallel")]
        let pool = match params.threads {
            Some(n) if params.parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("hamming2nn-{i}"))
                    .build()
                    .map_err(|e| MatchError::launch(format!("worker pool: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            params,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    #[inline]
    pub fn threshold(&self) -> Distance {
        self.params.threshold
    }

    /// Match every query and write one result per query into `out`.
    ///
    /// `out.len()` must equal `queries.len()`. On error nothing in `out` may
    /// be relied upon.
    pub fn match_into(
        &self,
        train: LinearView<'_>,
        queries: CachedView<'_>,
        out: &mut [MatchResult],
    ) -> Result<()> {
        let threshold = self.params.threshold;
        self.fill(train, queries, out, |top| decide(top, threshold))?;
        debug!(
            accepted = out.iter().filter(|r| r.is_match()).count(),
            queries = out.len(),
            "matching finished"
        );
        Ok(())
    }

    /// Match `queries` against `train`, allocating the result array.
    pub fn match_sets(
        &self,
        train: &DescriptorSet,
        queries: &DescriptorSet,
    ) -> Result<Vec<MatchResult>> {
        let mut out = alloc_slots(queries.len(), MatchResult::NO_MATCH, "match results")?;
        self.match_into(train.linear_view(), queries.cached_view(), &mut out)?;
        Ok(out)
    }

    /// Merged top two per query, before the margin test.
    pub fn top_two_into(
        &self,
        train: LinearView<'_>,
        queries: CachedView<'_>,
        out: &mut [TopTwo],
    ) -> Result<()> {
        self.fill(train, queries, out, |top| top)
    }

    /// Allocating form of [`BruteForceMatcher::top_two_into`].
    pub fn top_two_sets(
        &self,
        train: &DescriptorSet,
        queries: &DescriptorSet,
    ) -> Result<Vec<TopTwo>> {
        let mut out = alloc_slots(queries.len(), TopTwo::new(), "top-two results")?;
        self.top_two_into(train.linear_view(), queries.cached_view(), &mut out)?;
        Ok(out)
    }

    fn fill<T, F>(
        &self,
        train: LinearView<'_>,
        queries: CachedView<'_>,
        out: &mut [T],
        finish: F,
    ) -> Result<()>
    where
        T: Send,
        F: Fn(TopTwo) -> T + Sync,
    {
        if out.len() != queries.len() {
            return Err(MatchError::ResultLength {
                expected: queries.len(),
                actual: out.len(),
            });
        }
        if train.len() > i32::MAX as usize {
            return Err(MatchError::launch(format!(
                "train set of {} descriptors exceeds the {} addressable by a match result",
                train.len(),
                i32::MAX
            )));
        }

        debug!(
            queries = queries.len(),
            train = train.len(),
            threshold = self.params.threshold,
            train_slices = self.params.train_slices,
            query_block = self.params.query_block,
            parallel = self.params.parallel,
            "matching"
        );

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.dispatch(train, queries, out, &finish)
        }))
        .map_err(|payload| {
            let msg = panic_message(payload.as_ref());
            warn!(%msg, "worker fault during matching");
            MatchError::Compute(msg)
        })
    }

    fn dispatch<T, F>(&self, train: LinearView<'_>, queries: CachedView<'_>, out: &mut [T], finish: &F)
    where
        T: Send,
        F: Fn(TopTwo) -> T + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            if self.params.parallel {
                match &self.pool {
                    Some(pool) => pool.install(|| self.fill_parallel(train, queries, out, finish)),
                    None => self.fill_parallel(train, queries, out, finish),
                }
                return;
            }
        }

        fill_sequential(train, queries, out, finish);
    }

    #[cfg(feature = "parallel")]
    fn fill_parallel<T, F>(
        &self,
        train: LinearView<'_>,
        queries: CachedView<'_>,
        out: &mut [T],
        finish: &F,
    ) where
        T: Send,
        F: Fn(TopTwo) -> T + Sync,
    {
        let block = self.params.query_block;
        let slices = self.params.train_slices.min(train.len().max(1));

        out.par_chunks_mut(block)
            .enumerate()
            .for_each(|(b, slots)| {
                let first = b * block;
                let mut staged = StagedQueries::new();
                queries.stage_into(first..first + slots.len(), &mut staged);

                let tops = (0..slices)
                    .into_par_iter()
                    .map(|s| sweep_block(&staged, train.part(s, slices)))
                    .reduce(|| vec![TopTwo::new(); staged.len()], merge_slots);

                for (slot, top) in slots.iter_mut().zip(tops) {
                    *slot = finish(top);
                }
            });
    }
}

fn fill_sequential<T, F>(train: LinearView<'_>, queries: CachedView<'_>, out: &mut [T], finish: &F)
where
    F: Fn(TopTwo) -> T,
{
    for (qi, slot) in out.iter_mut().enumerate() {
        let query = queries.fetch(qi);
        *slot = finish(TopTwo::sweep(&query, train));
    }
}

/// One partial top two per staged query over one train slice.
///
/// Train-major: each train record is loaded once and compared against the
/// whole block, and each query still observes its candidates in index order.
#[cfg(feature = "parallel")]
fn sweep_block(staged: &[Descriptor], train: LinearView<'_>) -> Vec<TopTwo> {
    let mut tops = vec![TopTwo::new(); staged.len()];
    for (index, t) in train.iter() {
        let index = index as u32;
        for (top, q) in tops.iter_mut().zip(staged) {
            top.observe(Candidate::new(hamming(q, t), index));
        }
    }
    tops
}

pub(crate) fn alloc_slots<T: Clone>(len: usize, fill: T, what: &'static str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| MatchError::Allocation {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    out.resize(len, fill);
    Ok(out)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// One-shot match with default partitioning.
pub fn match_descriptors(
    train: &DescriptorSet,
    queries: &DescriptorSet,
    threshold: Distance,
) -> Result<Vec<MatchResult>> {
    BruteForceMatcher::new(MatchParams::new(threshold))?.match_sets(train, queries)
}
