//! Filename normalization pass.
//!
//! `holiday(beach).jpg` becomes `beach_00001.jpg`. Only names whose stem
//! holds exactly one `(` before exactly one `)` are touched.

use super::list_directory;
use crate::error::DedupError;
use crate::events::{DedupEvent, DedupPass, DedupProgress, Event, EventSender};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a rename pass
#[derive(Debug, Default)]
pub struct RenameReport {
    /// Files scanned
    pub total: usize,
    /// `(from, to)` in the order they happened
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Collisions and failed renames; the pass carried on past each
    pub errors: Vec<DedupError>,
}

impl RenameReport {
    /// Files left as they were, including failures
    pub fn untouched(&self) -> usize {
        self.total - self.renamed.len()
    }
}

/// Serializable view for summaries
#[derive(Debug, Serialize)]
pub struct RenameSummary {
    pub total: usize,
    pub renamed: usize,
    pub errors: Vec<String>,
}

impl From<&RenameReport> for RenameSummary {
    fn from(report: &RenameReport) -> Self {
        Self {
            total: report.total,
            renamed: report.renamed.len(),
            errors: report.errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Text between the parentheses of a qualifying stem
pub fn parenthesized_suffix(stem: &str) -> Option<&str> {
    if stem.matches('(').count() != 1 || stem.matches(')').count() != 1 {
        return None;
    }
    let open = stem.find('(')?;
    let close = stem.find(')')?;
    if open > close {
        return None;
    }
    Some(&stem[open + 1..close])
}

/// New file name for `file_name`, or `None` when it does not qualify
pub fn normalized_name(file_name: &str, counter: u32) -> Option<String> {
    let path = Path::new(file_name);
    let stem = path.file_stem()?.to_str()?;
    let suffix = parenthesized_suffix(stem)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    Some(format!("{suffix}_{counter:05}{ext}"))
}

/// Rename every qualifying direct child of `dir`, in name order.
///
/// The counter starts at 1 and advances only on a successful rename. An
/// occupied target is reported as a collision and the file is left alone.
pub fn normalize_filenames(dir: &Path, events: &EventSender) -> Result<RenameReport, DedupError> {
    let files = list_directory(dir)?;
    let total = files.len();
    let mut report = RenameReport {
        total,
        ..RenameReport::default()
    };
    let mut counter: u32 = 1;

    events.send(Event::Dedup(DedupEvent::Started {
        pass: DedupPass::Rename,
        total,
    }));

    for (i, from) in files.iter().enumerate() {
        let target_name = from
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| normalized_name(n, counter));

        if let Some(name) = target_name {
            let to = dir.join(&name);
            match rename_without_overwrite(from, &to) {
                Ok(()) => {
                    tracing::debug!(from = %from.display(), to = %to.display(), "renamed");
                    events.send(Event::Dedup(DedupEvent::Renamed {
                        from: from.clone(),
                        to: to.clone(),
                    }));
                    report.renamed.push((from.clone(), to));
                    counter += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rename skipped");
                    events.send(Event::Dedup(DedupEvent::Error {
                        path: from.clone(),
                        message: e.to_string(),
                    }));
                    report.errors.push(e);
                }
            }
        }

        events.send(Event::Dedup(DedupEvent::Progress(DedupProgress {
            pass: DedupPass::Rename,
            processed: i + 1,
            total,
        })));
    }

    events.send(Event::Dedup(DedupEvent::Completed {
        pass: DedupPass::Rename,
    }));
    tracing::info!(
        dir = %dir.display(),
        renamed = report.renamed.len(),
        errors = report.errors.len(),
        "rename pass finished"
    );
    Ok(report)
}

fn rename_without_overwrite(from: &Path, to: &Path) -> Result<(), DedupError> {
    if from == to {
        return Ok(());
    }
    if to.exists() {
        return Err(DedupError::Collision {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }
    fs::rename(from, to).map_err(|source| DedupError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
