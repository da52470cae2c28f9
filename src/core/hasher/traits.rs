//! Algorithm names and hash values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available hash algorithms.
///
/// Declaration order is the canonical column order of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    /// Average Hash (aHash) - Fast, good for exact duplicates
    Average,
    /// Perceptual Hash (pHash) - DCT-based, robust to edits
    Perceptual,
    /// Difference Hash (dHash) - Compares brightness gradients
    Difference,
    /// Wavelet Hash (wHash) - Haar wavelet decomposition
    Wavelet,
    /// Color Hash - Hue/saturation distribution
    Color,
}

impl HashAlgorithmKind {
    /// All algorithms in canonical order
    pub const ALL: [HashAlgorithmKind; 5] = [
        HashAlgorithmKind::Average,
        HashAlgorithmKind::Perceptual,
        HashAlgorithmKind::Difference,
        HashAlgorithmKind::Wavelet,
        HashAlgorithmKind::Color,
    ];

    /// Column title used in the record store header
    pub fn column_name(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Average => "Average Hash",
            HashAlgorithmKind::Perceptual => "Perceptual Hash",
            HashAlgorithmKind::Difference => "Difference Hash",
            HashAlgorithmKind::Wavelet => "Wavelet Hash",
            HashAlgorithmKind::Color => "Color Hash",
        }
    }

    /// Short conventional name (aHash, pHash, ...)
    pub fn short_name(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Average => "aHash",
            HashAlgorithmKind::Perceptual => "pHash",
            HashAlgorithmKind::Difference => "dHash",
            HashAlgorithmKind::Wavelet => "wHash",
            HashAlgorithmKind::Color => "colorHash",
        }
    }
}

impl fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Error returned when an algorithm name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown hash algorithm '{}'", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for HashAlgorithmKind {
    type Err = UnknownAlgorithm;

    /// Accepts column titles, short names and plain words, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        HashAlgorithmKind::ALL
            .into_iter()
            .find(|kind| {
                let plain = kind.column_name().trim_end_matches(" Hash");
                wanted.eq_ignore_ascii_case(kind.column_name())
                    || wanted.eq_ignore_ascii_case(kind.short_name())
                    || wanted.eq_ignore_ascii_case(plain)
            })
            .ok_or_else(|| UnknownAlgorithm(wanted.to_string()))
    }
}

/// Normalise a requested algorithm set: canonical order, no repeats.
pub fn canonical_order(algorithms: &[HashAlgorithmKind]) -> Vec<HashAlgorithmKind> {
    let mut ordered = algorithms.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
}

/// An opaque printable hash token produced by one algorithm.
///
/// Length and alphabet are algorithm-defined. Two values are only
/// comparable when they come from the same algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashString(String);

impl HashString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Hex-encode raw hash bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters (the unit Hamming distance counts in)
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for HashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HashString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for HashString {
    fn from(value: String) -> Self {
        Self(value)
    }
}
