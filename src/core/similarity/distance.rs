//! Character-wise Hamming distance between hash strings.

use crate::core::hasher::HashString;

/// Count positions whose characters differ, up to the shorter length.
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    a.chars()
        .zip(b.chars())
        .filter(|(x, y)| x != y)
        .count() as u32
}

/// [`hamming_distance`] for hash tokens
pub fn hash_distance(a: &HashString, b: &HashString) -> u32 {
    hamming_distance(a.as_str(), b.as_str())
}

/// Similarity as a percentage of the compared length (0-100)
pub fn similarity_percent(a: &HashString, b: &HashString) -> f64 {
    let compared = a.char_len().min(b.char_len());
    if compared == 0 {
        return 100.0;
    }
    let distance = hash_distance(a, b) as f64;
    (1.0 - distance / compared as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(hamming_distance("ff00aa55", "ff00aa55"), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(
            hamming_distance("0f1e2d3c", "0f1e2dff"),
            hamming_distance("0f1e2dff", "0f1e2d3c")
        );
    }

    #[test]
    fn distance_counts_differing_characters() {
        assert_eq!(hamming_distance("abcd", "abzz"), 2);
        assert_eq!(hamming_distance("0000", "ffff"), 4);
    }

    #[test]
    fn unequal_lengths_compare_common_prefix() {
        assert_eq!(hamming_distance("abcdef", "abc"), 0);
        assert_eq!(hamming_distance("abx", "abcdef"), 1);
    }

    #[test]
    fn similarity_is_100_for_identical() {
        let hash = HashString::new("ff00");
        assert_eq!(similarity_percent(&hash, &hash), 100.0);
        assert_eq!(
            similarity_percent(&HashString::new("ff00"), &HashString::new("0000")),
            50.0
        );
    }
}
