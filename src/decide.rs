//! Margin test and per-query match results.
//!
//! A query is matched to its nearest train descriptor only when the second
//! nearest is at least `threshold` bits further away:
//!
//! ```text
//! accept  <=>  best is a real candidate  &&  second.distance - best.distance >= threshold
//! ```
//!
//! The comparison is inclusive, so `threshold == 0` accepts every query that
//! has a nearest neighbor, ties included. For binary descriptors the margin is
//! an absolute bit count, not a ratio of distances.

use std::fmt;

use crate::distance::Distance;
use crate::top_two::TopTwo;

/// Outcome for one query: a train index, or [`MatchResult::NO_MATCH`].
///
/// Stored as `i32` with `-1` as the sentinel so a `&[MatchResult]` has the
/// same layout as a plain `int` result array.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MatchResult(i32);

impl MatchResult {
    /// No acceptable match.
    pub const NO_MATCH: Self = Self(-1);

    /// Accepted match against train index `index`.
    ///
    /// Panics if `index` does not fit in an `i32`.
    #[inline]
    pub fn matched(index: usize) -> Self {
        match i32::try_from(index) {
            Ok(i) => Self(i),
            Err(_) => panic!("train index {index} does not fit a match result"),
        }
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn is_match(self) -> bool {
        self.0 >= 0
    }

    /// The matched train index, if any.
    #[inline]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl Default for MatchResult {
    fn default() -> Self {
        Self::NO_MATCH
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "Match({i})"),
            None => write!(f, "NoMatch"),
        }
    }
}

impl From<MatchResult> for Option<usize> {
    fn from(r: MatchResult) -> Self {
        r.index()
    }
}

impl From<MatchResult> for i32 {
    fn from(r: MatchResult) -> Self {
        r.0
    }
}

/// Accept or reject one query's merged top two.
#[inline]
#[must_use]
pub fn decide(top: TopTwo, threshold: Distance) -> MatchResult {
    if top.has_best() && top.margin() >= threshold {
        MatchResult::matched(top.best.index as usize)
    } else {
        MatchResult::NO_MATCH
    }
}

/// An accepted `(query, train)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    pub query: usize,
    pub train: usize,
}

/// Accepted pairs from a result array, in query order.
pub fn collect_matches(results: &[MatchResult]) -> Vec<Match> {
    results
        .iter()
        .enumerate()
        .filter_map(|(query, r)| r.index().map(|train| Match { query, train }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::top_two::Candidate;

    fn top(best: (Distance, u32), second: (Distance, u32)) -> TopTwo {
        TopTwo {
            best: Candidate::new(best.0, best.1),
            second: Candidate::new(second.0, second.1),
        }
    }

    #[test]
    fn margin_equal_to_threshold_is_accepted() {
        let t = top((2, 7), (7, 1));
        assert_eq!(decide(t, 5), MatchResult::matched(7));
    }

    #[test]
    fn margin_one_below_threshold_is_rejected() {
        let t = top((2, 7), (6, 1));
        assert_eq!(decide(t, 5), MatchResult::NO_MATCH);
    }

    #[test]
    fn zero_threshold_accepts_ties() {
        let t = top((3, 0), (3, 1));
        assert_eq!(decide(t, 0), MatchResult::matched(0));
        assert_eq!(decide(t, 1), MatchResult::NO_MATCH);
    }

    #[test]
    fn empty_top_two_never_matches() {
        for threshold in [0, 1, 512] {
            assert_eq!(decide(TopTwo::new(), threshold), MatchResult::NO_MATCH);
        }
    }

    #[test]
    fn result_accessors() {
        assert_eq!(MatchResult::NO_MATCH.raw(), -1);
        assert_eq!(MatchResult::NO_MATCH.index(), None);
        assert_eq!(MatchResult::matched(12).index(), Some(12));
        assert!(MatchResult::matched(0).is_match());
        assert_eq!(format!("{:?}", MatchResult::matched(3)), "Match(3)");
        assert_eq!(MatchResult::default(), MatchResult::NO_MATCH);
    }

    #[test]
    fn collect_skips_rejections() {
        let results = [
            MatchResult::matched(4),
            MatchResult::NO_MATCH,
            MatchResult::matched(0),
        ];
        assert_eq!(
            collect_matches(&results),
            vec![Match { query: 0, train: 4 }, Match { query: 2, train: 0 }]
        );
    }
}
