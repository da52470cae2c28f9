//! # Similarity Module
//!
//! Finds the stored records whose hash is closest to a query hash.
//!
//! ## How It Works
//! 1. Read the query algorithm's value from every record
//! 2. Count differing characters against the query (Hamming distance)
//! 3. Stable-sort by distance and keep the first `k`
//!
//! There is no index structure; every query is a single linear scan.
//!
//! ## Unequal Lengths
//! | Policy     | Behaviour                                   |
//! |------------|---------------------------------------------|
//! | `Truncate` | compare the common prefix (default)         |
//! | `Strict`   | leave the candidate out, report it skipped  |

mod distance;
mod index;
mod search;

pub use distance::{hamming_distance, hash_distance, similarity_percent};
pub use index::{
    nearest, nearest_to_record, nearest_with, Neighbor, SearchOutcome, SkipReason,
    SkippedCandidate,
};
pub use search::{filter, find_first};

use serde::{Deserialize, Serialize};

/// Default number of neighbours returned
pub const DEFAULT_K: usize = 20;

/// How to compare hashes of different lengths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthPolicy {
    #[default]
    Truncate,
    Strict,
}

/// Options for a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum neighbours returned
    pub k: usize,
    pub length_policy: LengthPolicy,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self {
            k: DEFAULT_K,
            length_policy: LengthPolicy::Truncate,
        }
    }

    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    /// Shorthand for [`LengthPolicy::Strict`]
    pub fn strict(self) -> Self {
        self.length_policy(LengthPolicy::Strict)
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new()
    }
}
