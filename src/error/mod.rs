//! # Error Module
//!
//! Error types for the image hash catalogue.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-item failures are values** - a broken image or a bad row is
//!   recorded in a report, only file-level I/O failures abort an operation

use crate::core::hasher::HashAlgorithmKind;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Dedup error: {0}")]
    Dedup(#[from] DedupError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while enumerating assets
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata for {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while hashing a single asset.
///
/// Any of these marks the whole asset as failed; the batch continues.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("{algorithm} failed for {path}: {reason}")]
    Algorithm {
        path: PathBuf,
        algorithm: HashAlgorithmKind,
        reason: String,
    },

    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path is not valid UTF-8 and cannot be stored: {path}")]
    NonUtf8Path { path: PathBuf },
}

impl HashError {
    /// Path of the asset that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            HashError::Decode { path, .. }
            | HashError::Algorithm { path, .. }
            | HashError::Io { path, .. }
            | HashError::NonUtf8Path { path } => path,
        }
    }
}

/// Errors raised by the record store. All of these are fatal to the
/// operation that raised them; malformed rows are reported separately.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access record store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid header in {path}: {reason}")]
    InvalidHeader { path: PathBuf, reason: String },

    #[error("Store {path} has columns [{found}] but this run writes [{expected}]. Use a new file or rewrite mode.")]
    SchemaMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

/// A data row whose column count does not match the header.
///
/// Reported per row; loading continues past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed row at line {line}: expected {expected} columns, found {found}")]
pub struct MalformedRow {
    /// 1-based line number where the row starts
    pub line: usize,
    /// Column count declared by the header
    pub expected: usize,
    /// Column count actually present
    pub found: usize,
}

/// Errors from the rename and duplicate-removal passes
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Failed to list directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot rename {from} to {to}: target already exists")]
    Collision { from: PathBuf, to: PathBuf },

    #[error("Failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path} for digest: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
