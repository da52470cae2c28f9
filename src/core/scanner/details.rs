//! Per-asset file and image details.

use super::ImageFormat;
use crate::error::ScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Descriptive details about one asset. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDetails {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Creation time, when the platform records one
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub format: ImageFormat,
    /// Pixel dimensions read from the image header
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl AssetDetails {
    /// Read file metadata and the image header for `path`.
    ///
    /// Fails only if the file's metadata cannot be read; an undecodable
    /// header just leaves the dimensions empty.
    pub fn inspect(path: &Path) -> Result<Self, ScanError> {
        let metadata = fs::metadata(path).map_err(|source| ScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Unknown);

        let (width, height) = match image::image_dimensions(path) {
            Ok((w, h)) => (Some(w), Some(h)),
            Err(_) => (None, None),
        };

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: metadata.len(),
            created_at: metadata.created().ok().map(to_utc),
            modified_at: metadata.modified().ok().map(to_utc),
            format,
            width,
            height,
        })
    }

    /// Get dimensions as a formatted string
    pub fn dimensions_display(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
