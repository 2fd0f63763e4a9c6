//! Incremental best/second-best tracking and its merge.
//!
//! # Ordering
//!
//! Candidates are ordered by `(distance, index)`. During an in-order sweep
//! the index part never decides anything (later candidates always have a
//! larger index), so [`TopTwo::observe`] behaves exactly like the plain
//! "strictly smaller distance wins" rule. The index only matters when partial
//! results from disjoint slices are merged: it makes [`TopTwo::merge`]
//! associative *and* commutative, so the merged value is the one a single
//! sequential sweep would have produced, however the train set was split and
//! whatever order the partials arrived in.
//!
//! Equal distances are never collapsed. Two training vectors at the same
//! minimal distance both land in the top two and give a zero margin.

use std::cmp::Ordering;

use crate::descriptor::{Descriptor, LinearView};
use crate::distance::{hamming, Distance, MAX_DISTANCE};

/// A train-set index paired with its distance to one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub distance: Distance,
    pub index: u32,
}

impl Candidate {
    /// Index value of an empty slot.
    pub const INVALID_INDEX: u32 = u32::MAX;

    /// Placeholder for a slot that has seen nothing.
    pub const EMPTY: Self = Self {
        distance: MAX_DISTANCE,
        index: Self::INVALID_INDEX,
    };

    #[inline]
    pub const fn new(distance: Distance, index: u32) -> Self {
        Self { distance, index }
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.index != Self::INVALID_INDEX
    }

    #[inline]
    fn key(&self) -> (Distance, u32) {
        (self.distance, self.index)
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The two smallest candidates seen for one query.
///
/// Invariant: `best <= second`, hence `best.distance <= second.distance <= 512`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopTwo {
    pub best: Candidate,
    pub second: Candidate,
}

impl Default for TopTwo {
    fn default() -> Self {
        Self::new()
    }
}

impl TopTwo {
    /// Nothing observed yet.
    #[inline]
    pub const fn new() -> Self {
        Self {
            best: Candidate::EMPTY,
            second: Candidate::EMPTY,
        }
    }

    /// Feed one candidate.
    #[inline(always)]
    pub fn observe(&mut self, c: Candidate) {
        if c < self.best {
            self.second = self.best;
            self.best = c;
        } else if c < self.second {
            self.second = c;
        }
    }

    /// Combine two partial results over disjoint train ranges.
    ///
    /// Observes `other.best` then `other.second` on a copy of `self`.
    /// Because `observe` keeps the two smallest of everything it has seen,
    /// the result is the two smallest of all four slots.
    #[inline]
    #[must_use]
    pub fn merge(self, other: TopTwo) -> TopTwo {
        let mut merged = self;
        merged.observe(other.best);
        merged.observe(other.second);
        merged
    }

    /// Sweep one query over a train view, in index order.
    #[inline]
    #[must_use]
    pub fn sweep(query: &Descriptor, train: LinearView<'_>) -> TopTwo {
        let mut top = TopTwo::new();
        top.sweep_into(query, train);
        top
    }

    /// Continue an existing sweep over another train view.
    #[inline]
    pub fn sweep_into(&mut self, query: &Descriptor, train: LinearView<'_>) {
        for (index, t) in train.iter() {
            // Callers bound train sizes to i32::MAX, so the cast is lossless.
            self.observe(Candidate::new(hamming(query, t), index as u32));
        }
    }

    /// `second.distance - best.distance`.
    #[inline]
    pub fn margin(&self) -> Distance {
        self.second.distance - self.best.distance
    }

    /// `true` once at least one real candidate has been observed.
    #[inline]
    pub fn has_best(&self) -> bool {
        self.best.is_valid()
    }
}

impl Extend<Candidate> for TopTwo {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        for c in iter {
            self.observe(c);
        }
    }
}

impl FromIterator<Candidate> for TopTwo {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut top = TopTwo::new();
        top.extend(iter);
        top
    }
}

/// Merge `partial` into `acc` slot by slot.
pub(crate) fn merge_slots(mut acc: Vec<TopTwo>, partial: Vec<TopTwo>) -> Vec<TopTwo> {
    debug_assert_eq!(acc.len(), partial.len());
    for (a, p) in acc.iter_mut().zip(partial) {
        *a = a.merge(p);
    }
    acc
}
