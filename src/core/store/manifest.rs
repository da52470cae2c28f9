//! One-column selection manifests named by timestamp.

use super::codec::{parse_rows, write_row};
use crate::error::StoreError;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `YYYYMMDDHHMMSS.csv` for the given instant
pub fn manifest_file_name(at: DateTime<Local>) -> String {
    at.format("%Y%m%d%H%M%S.csv").to_string()
}

/// Write `paths` into a new manifest under `dir`, one path per row.
///
/// Paths that are not valid UTF-8 are skipped with a warning.
pub fn write_manifest(dir: &Path, paths: &[PathBuf]) -> Result<PathBuf, StoreError> {
    let target = dir.join(manifest_file_name(Local::now()));
    let io_error = |source| StoreError::Io {
        path: target.clone(),
        source,
    };

    let file = File::create(&target).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    let mut entries = 0;
    for path in paths {
        let Some(text) = path.to_str() else {
            tracing::warn!(path = %path.display(), "skipping non-UTF-8 path");
            continue;
        };
        write_row(&mut writer, &[text]).map_err(io_error)?;
        entries += 1;
    }
    writer.flush().map_err(io_error)?;

    tracing::info!(manifest = %target.display(), entries, "wrote manifest");
    Ok(target)
}

/// Paths listed in a manifest, in file order
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse_rows(&text)
        .into_iter()
        .filter_map(|row| row.fields.into_iter().next())
        .filter(|first| !first.is_empty())
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn file_name_is_a_compact_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(manifest_file_name(at), "20240309070501.csv");
    }

    #[test]
    fn manifest_lists_paths_in_order() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            PathBuf::from("/photos/z.png"),
            PathBuf::from("/photos/with, comma.jpg"),
            PathBuf::from("/photos/a.png"),
        ];

        let manifest = write_manifest(dir.path(), &paths).unwrap();
        assert_eq!(manifest.extension().unwrap(), "csv");

        assert_eq!(read_manifest(&manifest).unwrap(), paths);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("hand.csv");
        fs::write(&manifest, "/a.png\n\n/b.png\n").unwrap();

        assert_eq!(
            read_manifest(&manifest).unwrap(),
            vec![PathBuf::from("/a.png"), PathBuf::from("/b.png")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_left_out() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let paths = vec![
            PathBuf::from("/photos/a.jpg"),
            PathBuf::from(OsStr::from_bytes(b"/photos/b\xfe.jpg")),
            PathBuf::from("/photos/c.jpg"),
        ];

        let manifest = write_manifest(dir.path(), &paths).unwrap();

        assert_eq!(
            read_manifest(&manifest).unwrap(),
            vec![PathBuf::from("/photos/a.jpg"), PathBuf::from("/photos/c.jpg")]
        );
        assert!(!fs::read_to_string(&manifest).unwrap().contains('\u{fffd}'));
    }
}
