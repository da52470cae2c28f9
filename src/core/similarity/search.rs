//! Case-insensitive text search over records.

use crate::core::hasher::HashRecord;

fn matches(record: &HashRecord, needle: &str) -> bool {
    record
        .asset_path
        .to_string_lossy()
        .to_lowercase()
        .contains(needle)
        || record
            .hashes
            .values()
            .any(|hash| hash.as_str().to_lowercase().contains(needle))
}

/// Index of the first record whose path or any hash contains `term`
pub fn find_first(records: &[HashRecord], term: &str) -> Option<usize> {
    let needle = term.to_lowercase();
    records.iter().position(|record| matches(record, &needle))
}

/// Indices of every matching record, in store order
pub fn filter(records: &[HashRecord], term: &str) -> Vec<usize> {
    let needle = term.to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches(record, &needle))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::HashAlgorithmKind;

    fn records() -> Vec<HashRecord> {
        vec![
            HashRecord::new("/photos/Beach.png").with_hash(HashAlgorithmKind::Average, "00ff"),
            HashRecord::new("/photos/forest.jpg").with_hash(HashAlgorithmKind::Average, "abcd"),
            HashRecord::new("/photos/beach-2.png").with_hash(HashAlgorithmKind::Average, "1234"),
        ]
    }

    #[test]
    fn path_match_ignores_case() {
        let records = records();
        assert_eq!(find_first(&records, "BEACH"), Some(0));
        assert_eq!(filter(&records, "beach"), vec![0, 2]);
    }

    #[test]
    fn hash_values_are_searched() {
        assert_eq!(find_first(&records(), "ABC"), Some(1));
    }

    #[test]
    fn no_match_is_none() {
        let records = records();
        assert_eq!(find_first(&records, "mountain"), None);
        assert!(filter(&records, "mountain").is_empty());
    }
}
