//! The per-asset output of a hashing run.

use super::traits::{HashAlgorithmKind, HashString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Hashes computed for one asset.
///
/// Iteration over `hashes` follows the canonical algorithm order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub asset_path: PathBuf,
    pub hashes: BTreeMap<HashAlgorithmKind, HashString>,
}

impl HashRecord {
    pub fn new(asset_path: impl Into<PathBuf>) -> Self {
        Self {
            asset_path: asset_path.into(),
            hashes: BTreeMap::new(),
        }
    }

    /// Builder-style insert, handy for fixtures
    pub fn with_hash(mut self, algorithm: HashAlgorithmKind, hash: impl Into<HashString>) -> Self {
        self.hashes.insert(algorithm, hash.into());
        self
    }

    pub fn insert(&mut self, algorithm: HashAlgorithmKind, hash: HashString) {
        self.hashes.insert(algorithm, hash);
    }

    pub fn hash(&self, algorithm: HashAlgorithmKind) -> Option<&HashString> {
        self.hashes.get(&algorithm)
    }

    pub fn path(&self) -> &Path {
        &self.asset_path
    }

    /// Algorithms present on this record, canonical order
    pub fn algorithms(&self) -> Vec<HashAlgorithmKind> {
        self.hashes.keys().copied().collect()
    }
}
