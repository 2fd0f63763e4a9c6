//! End-to-end tests over generated datasets.
//!
//! Planted datasets have known answers: each query is a train descriptor
//! with a few bits flipped, far closer to its source than to any unrelated
//! random descriptor (around 256 bits away).

use std::io::{Seek, SeekFrom};

use hamming2nn::benchmark::{
    create_benchmark_dataset, create_planted_dataset, measure, MatchAccuracy,
};
use hamming2nn::{
    collect_matches, BruteForceMatcher, DescriptorSet, MatchParams, MatchResult,
};

#[test]
fn planted_queries_are_recovered() {
    let ds = create_planted_dataset(500, 200, 10, 36);
    let truth = ds.ground_truth.as_ref().expect("planted dataset has ground truth");

    let matcher = BruteForceMatcher::new(MatchParams::new(40)).expect("valid params");
    let results = matcher
        .match_sets(&ds.train, &ds.queries)
        .expect("matching failed");

    let acc = MatchAccuracy::evaluate(&results, truth);
    assert_eq!(acc.queries, 200);
    assert_eq!(acc.accepted, 200, "every planted query should pass the margin test");
    assert_eq!(acc.correct, 200);
    assert!((acc.precision() - 1.0).abs() < 1e-12);

    let pairs = collect_matches(&results);
    assert_eq!(pairs.len(), 200);
    assert!(pairs.iter().all(|m| m.train == truth[m.query]));
}

#[test]
fn duplicated_train_entry_makes_planted_query_ambiguous() {
    let ds = create_planted_dataset(64, 1, 4, 5);
    let source = ds.ground_truth.as_ref().unwrap()[0];

    let mut records = ds.train.as_slice().to_vec();
    records.push(records[source]);
    let train = DescriptorSet::new(records);

    let matcher = BruteForceMatcher::new(MatchParams::new(1)).expect("valid params");
    let results = matcher.match_sets(&train, &ds.queries).expect("matching failed");
    assert_eq!(results, vec![MatchResult::NO_MATCH]);

    let tops = matcher.top_two_sets(&train, &ds.queries).expect("matching failed");
    assert_eq!(tops[0].best.index as usize, source);
    assert_eq!(tops[0].second.index as usize, train.len() - 1);
    assert_eq!(tops[0].margin(), 0);
}

#[test]
fn raw_records_survive_a_file_round_trip() {
    let ds = create_benchmark_dataset(33, 0, 9);

    let mut file = tempfile::tempfile().expect("tempfile");
    ds.train.write_to(&mut file).expect("write failed");
    file.seek(SeekFrom::Start(0)).expect("seek failed");

    let loaded = DescriptorSet::read_from(&mut file, 33).expect("read failed");
    assert_eq!(loaded, ds.train);

    let from_bytes = DescriptorSet::from_bytes(&ds.train.to_bytes()).expect("parse failed");
    assert_eq!(from_bytes, ds.train);
}

#[test]
fn reading_past_end_of_file_is_a_transfer_error() {
    let ds = create_benchmark_dataset(3, 0, 9);
    let mut file = tempfile::tempfile().expect("tempfile");
    ds.train.write_to(&mut file).expect("write failed");
    file.seek(SeekFrom::Start(0)).expect("seek failed");

    let err = DescriptorSet::read_from(&mut file, 4).unwrap_err();
    assert!(matches!(err, hamming2nn::MatchError::Transfer(_)));
}

#[test]
fn benchmark_harness_reports_consistent_numbers() {
    let ds = create_benchmark_dataset(300, 120, 36);
    let matcher = BruteForceMatcher::new(MatchParams::new(5)).expect("valid params");

    let (report, results) = measure(&matcher, &ds, 2, 5).expect("benchmark failed");
    assert_eq!(report.queries, 120);
    assert_eq!(report.train, 300);
    assert_eq!(report.runs, 5);
    assert_eq!(report.matches, results.iter().filter(|r| r.is_match()).count());

    // Warm-up and measured runs must not change the answer.
    let fresh = matcher.match_sets(&ds.train, &ds.queries).expect("matching failed");
    assert_eq!(results, fresh);
    assert!(report.summary().contains(&format!("found {} matches", report.matches)));
}

#[test]
fn params_round_trip_through_json() {
    let params = MatchParams::new(12)
        .with_train_slices(6)
        .with_query_block(16)
        .with_threads(2);
    let json = serde_json::to_string(&params).expect("serialize");
    let parsed: MatchParams = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, params);

    let partial: MatchParams = serde_json::from_str(r#"{"threshold": 7}"#).expect("deserialize");
    assert_eq!(partial, MatchParams::new(7));
}
