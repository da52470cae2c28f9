//! Brute-force k-nearest-neighbour search over stored records.

use super::distance::hash_distance;
use super::{LengthPolicy, SearchOptions};
use crate::core::hasher::{HashAlgorithmKind, HashRecord, HashString};
use serde::Serialize;

/// One ranked candidate
#[derive(Debug, Clone, Serialize)]
pub struct Neighbor<'a> {
    pub distance: u32,
    /// Position of the record in the searched slice
    pub index: usize,
    pub record: &'a HashRecord,
}

/// Why a candidate was left out of the ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The record has no value for the searched algorithm
    MissingColumn,
    /// Lengths differ and the policy is strict
    LengthMismatch { query: usize, candidate: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedCandidate {
    pub index: usize,
    pub reason: SkipReason,
}

/// Ranked neighbours plus anything that could not be compared
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome<'a> {
    /// Ascending distance; ties keep input order
    pub neighbors: Vec<Neighbor<'a>>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Up to `k` records closest to `query`, default options otherwise
pub fn nearest<'a>(
    records: &'a [HashRecord],
    query: &HashString,
    algorithm: HashAlgorithmKind,
    k: usize,
) -> SearchOutcome<'a> {
    nearest_with(records, query, algorithm, &SearchOptions::new().k(k))
}

/// Scan every record once and keep the `options.k` closest.
pub fn nearest_with<'a>(
    records: &'a [HashRecord],
    query: &HashString,
    algorithm: HashAlgorithmKind,
    options: &SearchOptions,
) -> SearchOutcome<'a> {
    let mut outcome = SearchOutcome::default();
    let query_len = query.char_len();

    for (index, record) in records.iter().enumerate() {
        let Some(candidate) = record.hash(algorithm) else {
            outcome.skipped.push(SkippedCandidate {
                index,
                reason: SkipReason::MissingColumn,
            });
            continue;
        };

        if options.length_policy == LengthPolicy::Strict && candidate.char_len() != query_len {
            outcome.skipped.push(SkippedCandidate {
                index,
                reason: SkipReason::LengthMismatch {
                    query: query_len,
                    candidate: candidate.char_len(),
                },
            });
            continue;
        }

        outcome.neighbors.push(Neighbor {
            distance: hash_distance(query, candidate),
            index,
            record,
        });
    }

    // stable: equal distances stay in input order
    outcome.neighbors.sort_by_key(|n| n.distance);
    outcome.neighbors.truncate(options.k);

    tracing::debug!(
        %algorithm,
        candidates = records.len(),
        returned = outcome.neighbors.len(),
        skipped = outcome.skipped.len(),
        "similarity query"
    );
    outcome
}

/// Search with the hash of `records[index]`.
///
/// The record itself ranks first at distance 0. Returns `None` when the
/// index is out of range or the record lacks the algorithm.
pub fn nearest_to_record<'a>(
    records: &'a [HashRecord],
    index: usize,
    algorithm: HashAlgorithmKind,
    options: &SearchOptions,
) -> Option<SearchOutcome<'a>> {
    let query = records.get(index)?.hash(algorithm)?;
    Some(nearest_with(records, query, algorithm, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, dhash: &str) -> HashRecord {
        HashRecord::new(format!("/photos/{name}")).with_hash(HashAlgorithmKind::Difference, dhash)
    }

    fn corpus() -> Vec<HashRecord> {
        vec![
            record("far.png", "ffff"),
            record("tie-first.png", "0ff0"),
            record("exact.png", "0000"),
            record("tie-second.png", "ff00"),
            record("close.png", "0001"),
        ]
    }

    fn names<'a>(outcome: &SearchOutcome<'a>) -> Vec<String> {
        outcome
            .neighbors
            .iter()
            .map(|n| n.record.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn results_ascend_with_stable_ties() {
        let records = corpus();
        let outcome = nearest(&records, &"0000".into(), HashAlgorithmKind::Difference, 10);

        assert_eq!(
            names(&outcome),
            vec!["exact.png", "close.png", "tie-first.png", "tie-second.png", "far.png"]
        );
        let distances: Vec<u32> = outcome.neighbors.iter().map(|n| n.distance).collect();
        assert_eq!(distances, vec![0, 1, 2, 2, 4]);
    }

    #[test]
    fn k_caps_the_result() {
        let records = corpus();
        let outcome = nearest(&records, &"0000".into(), HashAlgorithmKind::Difference, 2);
        assert_eq!(names(&outcome), vec!["exact.png", "close.png"]);
    }

    #[test]
    fn large_k_returns_every_record_once() {
        let records = corpus();
        let outcome = nearest(&records, &"1234".into(), HashAlgorithmKind::Difference, 100);

        let mut indices: Vec<usize> = outcome.neighbors.iter().map(|n| n.index).collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_records_give_empty_result() {
        let outcome = nearest(&[], &"0000".into(), HashAlgorithmKind::Difference, 20);
        assert!(outcome.neighbors.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn records_without_the_column_are_skipped() {
        let records = vec![
            record("a.png", "0000"),
            HashRecord::new("/photos/b.png").with_hash(HashAlgorithmKind::Average, "0000"),
        ];
        let outcome = nearest(&records, &"0000".into(), HashAlgorithmKind::Difference, 5);

        assert_eq!(outcome.neighbors.len(), 1);
        assert_eq!(outcome.skipped[0].index, 1);
        assert_eq!(outcome.skipped[0].reason, SkipReason::MissingColumn);
    }

    #[test]
    fn truncate_policy_compares_common_prefix() {
        let records = vec![record("long.png", "00000000"), record("short.png", "00")];
        let outcome = nearest(&records, &"0000".into(), HashAlgorithmKind::Difference, 5);

        assert_eq!(outcome.neighbors.len(), 2);
        assert!(outcome.neighbors.iter().all(|n| n.distance == 0));
    }

    #[test]
    fn strict_policy_skips_length_mismatch() {
        let records = vec![record("long.png", "00000000"), record("same.png", "0001")];
        let options = SearchOptions::new().strict();
        let outcome = nearest_with(&records, &"0000".into(), HashAlgorithmKind::Difference, &options);

        assert_eq!(names(&outcome), vec!["same.png"]);
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::LengthMismatch {
                query: 4,
                candidate: 8
            }
        );
    }

    #[test]
    fn query_by_stored_record() {
        let records = corpus();
        let outcome = nearest_to_record(
            &records,
            4,
            HashAlgorithmKind::Difference,
            &SearchOptions::new().k(2),
        )
        .unwrap();

        assert_eq!(names(&outcome), vec!["close.png", "exact.png"]);
        assert!(nearest_to_record(&records, 99, HashAlgorithmKind::Difference, &SearchOptions::new()).is_none());
        assert!(nearest_to_record(&records, 0, HashAlgorithmKind::Color, &SearchOptions::new()).is_none());
    }
}
