//! # Core Module
//!
//! The presentation-agnostic catalogue engine.
//!
//! ## Modules
//! - `scanner` - Expands a selection into candidate images
//! - `hasher` - Names the hash algorithms and computes them
//! - `pipeline` - Hashes a batch concurrently with progress accounting
//! - `store` - Persists hash records as delimited text
//! - `similarity` - Ranks stored records by Hamming distance
//! - `dedup` - Normalizes file names and removes exact duplicates

pub mod dedup;
pub mod hasher;
pub mod pipeline;
pub mod scanner;
pub mod similarity;
pub mod store;

// Re-export commonly used types
pub use hasher::{HashAlgorithmKind, HashRecord, HashString};
pub use pipeline::{HashPipeline, PipelineResult, RunTally};
pub use scanner::Selection;
pub use store::{PersistMode, RecordStore};
