//! # Pipeline Module
//!
//! Hashes a batch of assets concurrently and streams the results into a
//! record store.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Expand the selection into candidate images
//! 2. **Hash** - Decode each image once and compute every requested algorithm
//! 3. **Write** - Hand each success to the store writer
//!
//! ## Parallelism
//! A rayon pool with exactly `concurrency` threads does the hashing. A
//! failed asset is counted and reported; it never stops the batch.

mod executor;
mod progress;

pub use executor::{
    catalogue, default_concurrency, AssetOutcome, CatalogRun, HashPipeline, PipelineBuilder,
    PipelineConfig, PipelineResult, RunTally,
};
pub use progress::{CancellationToken, ProgressCounters, ProgressSnapshot};
