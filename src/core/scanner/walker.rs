//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, AssetEnumerator, ScanResult, Selection};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for the enumerator
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom extensions to include (None = use the default allow-list)
    pub extensions: Option<Vec<String>>,
    /// Sort walked paths lexicographically so first-seen order is reproducible
    pub sort: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            max_depth: None,
            extensions: None,
            sort: true,
        }
    }
}

/// Enumerator implementation using the walkdir crate
pub struct WalkDirEnumerator {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirEnumerator {
    /// Create a new enumerator with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// Walk one root directory recursively
    fn walk_directory(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<(Vec<PathBuf>, Vec<ScanError>), ScanError> {
        if !root.is_dir() {
            return Err(ScanError::NotFound {
                path: root.to_path_buf(),
            });
        }

        let mut assets = Vec::new();
        let mut errors = Vec::new();
        let mut directories_scanned = 0;

        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }
        if self.config.sort {
            walker = walker.sort_by_file_name();
        }

        let include_hidden = self.config.include_hidden;
        let entries = walker.into_iter().filter_entry(|entry| {
            include_hidden
                || entry.depth() == 0
                || !entry.file_name().to_string_lossy().starts_with('.')
        });

        for entry_result in entries {
            match entry_result {
                Ok(entry) => {
                    let path = entry.path();

                    if entry.file_type().is_dir() {
                        directories_scanned += 1;
                        events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                            directories_scanned,
                            assets_found: assets.len(),
                            current_path: path.to_path_buf(),
                        })));
                        continue;
                    }

                    if !self.filter.should_include(path) {
                        continue;
                    }

                    events.send(Event::Scan(ScanEvent::AssetFound {
                        path: path.to_path_buf(),
                    }));
                    assets.push(path.to_path_buf());
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();

                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    tracing::warn!(path = %path.display(), "skipping unreadable entry: {}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        Ok((assets, errors))
    }

    /// Filter an explicit file list, keeping caller order
    fn filter_files(&self, files: &[PathBuf], events: &EventSender) -> (Vec<PathBuf>, Vec<ScanError>) {
        let mut assets = Vec::new();
        let mut errors = Vec::new();

        for path in files {
            if !self.filter.should_include(path) {
                continue;
            }
            if !path.is_file() {
                let error = ScanError::NotFound { path: path.clone() };
                events.send(Event::Scan(ScanEvent::Error {
                    path: path.clone(),
                    message: error.to_string(),
                }));
                errors.push(error);
                continue;
            }

            events.send(Event::Scan(ScanEvent::AssetFound { path: path.clone() }));
            assets.push(path.clone());
        }

        (assets, errors)
    }
}

impl AssetEnumerator for WalkDirEnumerator {
    fn enumerate(&self, selection: &Selection) -> Result<ScanResult, ScanError> {
        self.enumerate_with_events(selection, &crate::events::null_sender())
    }

    fn enumerate_with_events(
        &self,
        selection: &Selection,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            roots: match selection {
                Selection::Files(files) => files.clone(),
                Selection::Directory(root) => vec![root.clone()],
            },
        }));

        let (assets, errors) = match selection {
            Selection::Files(files) => self.filter_files(files, events),
            Selection::Directory(root) => self.walk_directory(root, events)?,
        };

        if assets.is_empty() {
            tracing::info!("selection matched no images");
            events.send(Event::Scan(ScanEvent::EmptySelection));
        }

        events.send(Event::Scan(ScanEvent::Completed {
            total_assets: assets.len(),
        }));

        Ok(ScanResult { assets, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_photo(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    #[test]
    fn empty_directory_is_empty_selection() {
        let temp_dir = TempDir::new().unwrap();
        let enumerator = WalkDirEnumerator::new(ScanConfig::default());

        let result = enumerator
            .enumerate(&Selection::Directory(temp_dir.path().to_path_buf()))
            .unwrap();

        assert!(result.is_empty_selection());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn walk_is_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a_dir");
        fs::create_dir(&nested).unwrap();

        create_test_photo(temp_dir.path(), "zeta.png");
        create_test_photo(temp_dir.path(), "beta.JPG");
        create_test_photo(&nested, "inner.gif");

        let enumerator = WalkDirEnumerator::new(ScanConfig::default());
        let result = enumerator
            .enumerate(&Selection::Directory(temp_dir.path().to_path_buf()))
            .unwrap();

        let names: Vec<_> = result
            .assets
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["inner.gif", "beta.JPG", "zeta.png"]);
    }

    #[test]
    fn non_images_are_excluded() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "photo.jpg");
        File::create(temp_dir.path().join("notes.txt")).unwrap();
        File::create(temp_dir.path().join("clip.mp4")).unwrap();

        let enumerator = WalkDirEnumerator::new(ScanConfig::default());
        let result = enumerator
            .enumerate(&Selection::Directory(temp_dir.path().to_path_buf()))
            .unwrap();

        assert_eq!(result.assets.len(), 1);
        assert!(result.assets[0].ends_with("photo.jpg"));
    }

    #[test]
    fn hidden_entries_can_be_excluded() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "visible.jpg");
        create_test_photo(temp_dir.path(), ".hidden.jpg");

        let config = ScanConfig {
            include_hidden: false,
            ..Default::default()
        };
        let result = WalkDirEnumerator::new(config)
            .enumerate(&Selection::Directory(temp_dir.path().to_path_buf()))
            .unwrap();

        assert_eq!(result.assets.len(), 1);
        assert!(result.assets[0].ends_with("visible.jpg"));
    }

    #[test]
    fn explicit_files_keep_caller_order() {
        let temp_dir = TempDir::new().unwrap();
        let b = create_test_photo(temp_dir.path(), "b.png");
        let a = create_test_photo(temp_dir.path(), "a.png");
        let txt = temp_dir.path().join("c.txt");
        File::create(&txt).unwrap();

        let result = WalkDirEnumerator::new(ScanConfig::default())
            .enumerate(&Selection::Files(vec![b.clone(), txt, a.clone()]))
            .unwrap();

        assert_eq!(result.assets, vec![b, a]);
    }

    #[test]
    fn missing_explicit_file_is_recorded() {
        let result = WalkDirEnumerator::new(ScanConfig::default())
            .enumerate(&Selection::Files(vec![PathBuf::from("/nonexistent/x.jpg")]))
            .unwrap();

        assert!(result.is_empty_selection());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn missing_root_directory_is_fatal() {
        let result = WalkDirEnumerator::new(ScanConfig::default())
            .enumerate(&Selection::Directory(PathBuf::from("/nonexistent/path/12345")));

        assert!(matches!(result, Err(ScanError::NotFound { .. })));
    }
}
