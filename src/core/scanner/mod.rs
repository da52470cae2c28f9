//! # Scanner Module
//!
//! Expands a user selection into an ordered list of candidate image paths.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - BMP (.bmp)
//! - GIF (.gif)
//! - TIFF (.tiff)
//!
//! ## Example
//! ```rust,ignore
//! use phash_catalog::core::scanner::{AssetEnumerator, ScanConfig, Selection, WalkDirEnumerator};
//!
//! let enumerator = WalkDirEnumerator::new(ScanConfig::default());
//! let result = enumerator.enumerate(&Selection::Directory("/Users/photos".into()))?;
//! if result.is_empty_selection() {
//!     return Ok(()); // zero work, not a fault
//! }
//! ```

mod details;
mod filter;
mod walker;

pub use details::AssetDetails;
pub use filter::ImageFilter;
pub use walker::{ScanConfig, WalkDirEnumerator};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the caller asked to catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Explicit files, kept in the given order
    Files(Vec<PathBuf>),
    /// A root directory walked recursively
    Directory(PathBuf),
}

impl Selection {
    /// Build a selection from command-line style paths.
    ///
    /// A single existing directory becomes `Directory`; anything else is
    /// treated as an explicit file list.
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        if paths.len() == 1 && paths[0].is_dir() {
            return Selection::Directory(paths.remove(0));
        }
        Selection::Files(paths)
    }
}

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "bmp" => ImageFormat::Bmp,
            "gif" => ImageFormat::Gif,
            "tiff" | "tif" => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    /// Check if this format is supported
    pub fn is_supported(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }
}

/// Result of an enumeration
#[derive(Debug)]
pub struct ScanResult {
    /// Candidate image paths, in enumeration order
    pub assets: Vec<PathBuf>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    /// Nothing matched: the caller has zero work, which is not a fault
    pub fn is_empty_selection(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Trait for asset enumerators
///
/// Implement this trait to create custom enumerators (e.g., for testing).
pub trait AssetEnumerator: Send + Sync {
    /// Expand a selection into candidate image paths
    fn enumerate(&self, selection: &Selection) -> Result<ScanResult, ScanError>;

    /// Enumerate with progress reporting via events
    fn enumerate_with_events(
        &self,
        selection: &Selection,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError>;
}
