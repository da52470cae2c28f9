//! # Dedup Module
//!
//! Two sequential passes over the direct children of one directory.
//!
//! 1. **Rename** - `prefix(name).ext` becomes `name_NNNNN.ext`
//! 2. **Remove duplicates** - byte-identical copies are deleted, the first
//!    file (by name) with each SHA-256 digest is kept
//!
//! Neither pass recurses into subdirectories.

mod confirm;
mod normalizer;
mod remover;

pub use confirm::{AutoConfirm, DeleteConfirmation, NeverConfirm};
pub use normalizer::{
    normalize_filenames, normalized_name, parenthesized_suffix, RenameReport, RenameSummary,
};
pub use remover::{
    content_digest, remove_duplicates, RemovalReport, RemovalSummary, RemovedDuplicate,
};

use crate::error::DedupError;
use crate::events::EventSender;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for [`run`]
#[derive(Debug, Clone, Default)]
pub struct DedupConfig {
    /// Delete duplicates without asking
    pub skip_confirmation: bool,
    /// Go straight to duplicate removal
    pub skip_rename: bool,
}

impl DedupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_confirmation(mut self, skip: bool) -> Self {
        self.skip_confirmation = skip;
        self
    }

    pub fn skip_rename(mut self, skip: bool) -> Self {
        self.skip_rename = skip;
        self
    }
}

/// Reports from both passes
#[derive(Debug)]
pub struct DedupReport {
    /// `None` when the rename pass was skipped
    pub rename: Option<RenameReport>,
    pub removal: RemovalReport,
}

/// Regular files directly inside `dir`, sorted by file name
pub fn list_directory(dir: &Path) -> Result<Vec<PathBuf>, DedupError> {
    let read_error = |source| DedupError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Rename, then remove duplicates
pub fn run<C>(
    dir: &Path,
    config: &DedupConfig,
    confirm: &mut C,
    events: &EventSender,
) -> Result<DedupReport, DedupError>
where
    C: DeleteConfirmation + ?Sized,
{
    let rename = if config.skip_rename {
        None
    } else {
        Some(normalize_filenames(dir, events)?)
    };
    let removal = remove_duplicates(dir, config.skip_confirmation, confirm, events)?;
    Ok(DedupReport { rename, removal })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use tempfile::TempDir;

    #[test]
    fn listing_is_sorted_and_shallow() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.jpg"), b"c").unwrap();

        let files = list_directory(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.jpg"), dir.path().join("b.jpg")]
        );
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = list_directory(&dir.path().join("gone"));
        assert!(matches!(result, Err(DedupError::ReadDirectory { .. })));
    }

    #[test]
    fn skip_rename_leaves_names_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a(x).jpg"), b"a").unwrap();

        let config = DedupConfig::new().skip_rename(true).skip_confirmation(true);
        let report = run(dir.path(), &config, &mut AutoConfirm, &null_sender()).unwrap();

        assert!(report.rename.is_none());
        assert!(dir.path().join("a(x).jpg").exists());
    }
}
