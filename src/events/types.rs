//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// All events emitted by the catalogue engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Enumeration events
    Scan(ScanEvent),
    /// Hashing events
    Hash(HashEvent),
    /// Record store events
    Store(StoreEvent),
    /// Rename / duplicate removal events
    Dedup(DedupEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Enumeration has started
    Started { roots: Vec<PathBuf> },
    /// Progress update while walking directories
    Progress(ScanProgress),
    /// A candidate image was found
    AssetFound { path: PathBuf },
    /// An entry could not be read, enumeration continues
    Error { path: PathBuf, message: String },
    /// Nothing matched the selection
    EmptySelection,
    /// Enumeration completed
    Completed { total_assets: usize },
}

/// Progress information during enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories visited so far
    pub directories_scanned: usize,
    /// Number of candidate images found so far
    pub assets_found: usize,
    /// Directory being visited
    pub current_path: PathBuf,
}

/// Events during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started { total_assets: usize, concurrency: usize },
    /// An asset reached a terminal result
    Progress(HashProgress),
    /// An asset failed, hashing continues
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed {
        succeeded: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Assets with a terminal result so far
    pub processed: usize,
    /// Total assets submitted
    pub total: usize,
    /// Asset that just finished
    pub current_path: PathBuf,
}

/// Events from the record store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreEvent {
    /// A header row was written to an empty store
    HeaderWritten { store: PathBuf },
    /// Rows were made durable
    Committed { store: PathBuf, rows: usize },
    /// A row was skipped while loading
    MalformedRow { store: PathBuf, line: usize, message: String },
}

/// The two sequential directory passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupPass {
    Rename,
    RemoveDuplicates,
}

/// Events from the rename and duplicate-removal passes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DedupEvent {
    /// A pass has started over `total` files
    Started { pass: DedupPass, total: usize },
    /// A file was handled
    Progress(DedupProgress),
    /// A file was renamed
    Renamed { from: PathBuf, to: PathBuf },
    /// A duplicate was deleted
    Removed { path: PathBuf, original: PathBuf },
    /// The caller declined to delete a duplicate
    Declined { path: PathBuf },
    /// A per-file failure, the pass continues
    Error { path: PathBuf, message: String },
    /// A pass finished
    Completed { pass: DedupPass },
}

/// Progress information during a directory pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupProgress {
    pub pass: DedupPass,
    pub processed: usize,
    pub total: usize,
}

impl DedupProgress {
    /// Fraction of files handled, 0.0 to 1.0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started { run_id: Uuid },
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed
    Completed { summary: PipelineSummary },
    /// A cancellation request was observed
    Cancelled,
}

/// Phases of a catalogue run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Hashing,
    Writing,
}

/// Summary of a catalogue run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Data rows written to the store by this run
    pub rows_written: usize,
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Hashing => write!(f, "Hashing"),
            PipelinePhase::Writing => write!(f, "Writing"),
        }
    }
}

impl std::fmt::Display for DedupPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupPass::Rename => write!(f, "Renaming"),
            DedupPass::RemoveDuplicates => write!(f, "Removing duplicates"),
        }
    }
}
