//! Throughput and accuracy measurement.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use super::datasets::BinaryDataset;
use crate::decide::MatchResult;
use crate::error::Result;
use crate::matcher::{alloc_slots, BruteForceMatcher};

/// Timing of repeated invocations over one dataset.
#[derive(Debug, Clone)]
pub struct ThroughputReport {
    pub queries: usize,
    pub train: usize,
    /// Measured invocations (warm-ups excluded).
    pub runs: usize,
    /// Wall time of all measured invocations.
    pub elapsed: Duration,
    /// Accepted matches in the last invocation.
    pub matches: usize,
}

impl ThroughputReport {
    /// Mean wall time of one invocation, in seconds.
    pub fn secs_per_run(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() / self.runs as f64
    }

    /// Distance evaluations per second.
    pub fn comparisons_per_sec(&self) -> f64 {
        let secs = self.secs_per_run();
        if secs == 0.0 {
            return 0.0;
        }
        self.queries as f64 * self.train as f64 / secs
    }

    pub fn summary(&self) -> String {
        format!(
            "found {} matches in {:.3} ms; throughput {:.3} billion comparisons/second",
            self.matches,
            self.secs_per_run() * 1e3,
            self.comparisons_per_sec() * 1e-9
        )
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Run `warmups` unmeasured then `runs` measured invocations on `dataset`.
///
/// Every invocation writes the same result buffer; results are identical
/// across repetitions, so the buffer after the last run is the answer.
pub fn measure(
    matcher: &BruteForceMatcher,
    dataset: &BinaryDataset,
    warmups: usize,
    runs: usize,
) -> Result<(ThroughputReport, Vec<MatchResult>)> {
    let train = dataset.train.linear_view();
    let queries = dataset.queries.cached_view();
    let mut out = alloc_slots(dataset.n_queries(), MatchResult::NO_MATCH, "match results")?;

    info!(warmups, "warming up");
    for _ in 0..warmups {
        matcher.match_into(train, queries, &mut out)?;
    }

    info!(runs, "measuring");
    let start = Instant::now();
    for _ in 0..runs {
        matcher.match_into(train, queries, &mut out)?;
    }
    let elapsed = start.elapsed();

    let report = ThroughputReport {
        queries: dataset.n_queries(),
        train: dataset.n_train(),
        runs,
        elapsed,
        matches: out.iter().filter(|r| r.is_match()).count(),
    };
    info!(
        matches = report.matches,
        ms_per_run = report.secs_per_run() * 1e3,
        gcomparisons_per_sec = report.comparisons_per_sec() * 1e-9,
        "benchmark finished"
    );
    Ok((report, out))
}

/// Quality of accepted matches against known sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchAccuracy {
    pub queries: usize,
    pub accepted: usize,
    /// Accepted matches pointing at the true source.
    pub correct: usize,
}

impl MatchAccuracy {
    /// Compare `results` with `ground_truth` (one source index per query).
    pub fn evaluate(results: &[MatchResult], ground_truth: &[usize]) -> Self {
        let mut acc = Self {
            queries: results.len().min(ground_truth.len()),
            ..Self::default()
        };
        for (r, &truth) in results.iter().zip(ground_truth) {
            if let Some(idx) = r.index() {
                acc.accepted += 1;
                if idx == truth {
                    acc.correct += 1;
                }
            }
        }
        acc
    }

    /// Fraction of accepted matches that are correct.
    pub fn precision(&self) -> f64 {
        if self.accepted == 0 {
            return 0.0;
        }
        self.correct as f64 / self.accepted as f64
    }

    /// Fraction of queries that were accepted.
    pub fn acceptance_rate(&self) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.queries as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_rates() {
        let report = ThroughputReport {
            queries: 1000,
            train: 1000,
            runs: 4,
            elapsed: Duration::from_millis(8),
            matches: 3,
        };
        assert!((report.secs_per_run() - 0.002).abs() < 1e-12);
        assert!((report.comparisons_per_sec() - 5.0e8).abs() < 1.0);
        assert!(report.summary().starts_with("found 3 matches in 2.000 ms"));
    }

    #[test]
    fn zero_runs_report_zero_rates() {
        let report = ThroughputReport {
            queries: 10,
            train: 10,
            runs: 0,
            elapsed: Duration::ZERO,
            matches: 0,
        };
        assert_eq!(report.secs_per_run(), 0.0);
        assert_eq!(report.comparisons_per_sec(), 0.0);
    }

    #[test]
    fn accuracy_counts() {
        let results = [
            MatchResult::matched(3),
            MatchResult::matched(1),
            MatchResult::NO_MATCH,
            MatchResult::matched(0),
        ];
        let acc = MatchAccuracy::evaluate(&results, &[3, 2, 5, 0]);
        assert_eq!(acc.accepted, 3);
        assert_eq!(acc.correct, 2);
        assert!((acc.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((acc.acceptance_rate() - 0.75).abs() < 1e-12);
    }
}
