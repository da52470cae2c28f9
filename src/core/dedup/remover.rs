//! Exact duplicate removal by content digest.

use super::confirm::DeleteConfirmation;
use super::list_directory;
use crate::error::DedupError;
use crate::events::{DedupEvent, DedupPass, DedupProgress, Event, EventSender};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

const READ_CHUNK: usize = 8 * 1024;

/// SHA-256 of a file's bytes as lowercase hex, read in 8 KiB chunks
pub fn content_digest(path: &Path) -> Result<String, DedupError> {
    let digest_error = |source| DedupError::Digest {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(digest_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut buffer).map_err(digest_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// A deleted file and the first-seen copy that was kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedDuplicate {
    pub path: PathBuf,
    pub original: PathBuf,
}

/// Outcome of a removal pass
#[derive(Debug, Default)]
pub struct RemovalReport {
    pub total: usize,
    /// Files whose digest was seen for the first time
    pub originals: usize,
    pub removed: Vec<RemovedDuplicate>,
    /// Duplicates the caller chose to keep
    pub declined: Vec<PathBuf>,
    /// Unreadable or undeletable files; each stays on disk
    pub errors: Vec<DedupError>,
}

/// Serializable view for summaries
#[derive(Debug, Serialize)]
pub struct RemovalSummary {
    pub total: usize,
    pub originals: usize,
    pub removed: Vec<RemovedDuplicate>,
    pub declined: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl From<&RemovalReport> for RemovalSummary {
    fn from(report: &RemovalReport) -> Self {
        Self {
            total: report.total,
            originals: report.originals,
            removed: report.removed.clone(),
            declined: report.declined.clone(),
            errors: report.errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Delete byte-identical copies among the direct children of `dir`.
///
/// Files are visited in name order and the first file with a given digest
/// is always kept. With `skip_confirmation` unset, `confirm` decides each
/// deletion; a declined duplicate stays and does not become an original.
pub fn remove_duplicates<C>(
    dir: &Path,
    skip_confirmation: bool,
    confirm: &mut C,
    events: &EventSender,
) -> Result<RemovalReport, DedupError>
where
    C: DeleteConfirmation + ?Sized,
{
    let files = list_directory(dir)?;
    let total = files.len();
    let mut report = RemovalReport {
        total,
        ..RemovalReport::default()
    };
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    events.send(Event::Dedup(DedupEvent::Started {
        pass: DedupPass::RemoveDuplicates,
        total,
    }));

    for (i, path) in files.iter().enumerate() {
        match content_digest(path) {
            Err(e) => {
                tracing::warn!(error = %e, "digest failed, keeping file");
                events.send(Event::Dedup(DedupEvent::Error {
                    path: path.clone(),
                    message: e.to_string(),
                }));
                report.errors.push(e);
            }
            Ok(digest) => match seen.get(&digest) {
                None => {
                    seen.insert(digest, path.clone());
                    report.originals += 1;
                }
                Some(original) => {
                    let approved = skip_confirmation || confirm.confirm_delete(path, original);
                    if !approved {
                        tracing::debug!(path = %path.display(), "deletion declined");
                        events.send(Event::Dedup(DedupEvent::Declined { path: path.clone() }));
                        report.declined.push(path.clone());
                    } else {
                        match fs::remove_file(path) {
                            Ok(()) => {
                                tracing::debug!(
                                    path = %path.display(),
                                    original = %original.display(),
                                    "removed duplicate"
                                );
                                events.send(Event::Dedup(DedupEvent::Removed {
                                    path: path.clone(),
                                    original: original.clone(),
                                }));
                                report.removed.push(RemovedDuplicate {
                                    path: path.clone(),
                                    original: original.clone(),
                                });
                            }
                            Err(source) => {
                                let e = DedupError::Remove {
                                    path: path.clone(),
                                    source,
                                };
                                tracing::warn!(error = %e, "removal failed");
                                events.send(Event::Dedup(DedupEvent::Error {
                                    path: path.clone(),
                                    message: e.to_string(),
                                }));
                                report.errors.push(e);
                            }
                        }
                    }
                }
            },
        }

        events.send(Event::Dedup(DedupEvent::Progress(DedupProgress {
            pass: DedupPass::RemoveDuplicates,
            processed: i + 1,
            total,
        })));
    }

    events.send(Event::Dedup(DedupEvent::Completed {
        pass: DedupPass::RemoveDuplicates,
    }));
    tracing::info!(
        dir = %dir.display(),
        removed = report.removed.len(),
        declined = report.declined.len(),
        errors = report.errors.len(),
        "duplicate pass finished"
    );
    Ok(report)
}
