//! # Store Module
//!
//! Durable tabular storage for hash records.
//!
//! ## Layout
//! One header row naming the columns, then one row per asset:
//!
//! ```text
//! Image,Average Hash,Difference Hash
//! /photos/a.jpg,ffd8c0c0e0f0f8fc,0f0f1f3f7fffffff
//! ```
//!
//! The first column is always `Image`. The remaining columns are the hash
//! algorithms of the run, in canonical order. Every row carries the same
//! columns as the header.
//!
//! ## Persist Modes
//! - [`PersistMode::StreamingAppend`] appends each record as it arrives.
//!   A crash loses at most the record being written.
//! - [`PersistMode::BatchRewrite`] holds records until the run ends and
//!   then replaces the file in one atomic step, in submission order.

mod codec;
mod manifest;
mod reader;
mod writer;

pub use codec::{encode_row, parse_rows, ParsedRow};
pub use manifest::{manifest_file_name, read_manifest, write_manifest};
pub use reader::{load, LoadReport};
pub use writer::{BatchRewriteWriter, RecordWriter, StreamingAppendWriter};

use crate::core::hasher::{canonical_order, HashAlgorithmKind, HashRecord};
use crate::error::StoreError;
use crate::events::{null_sender, EventSender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Title of the asset path column
pub const IMAGE_COLUMN: &str = "Image";

/// How a run makes its records durable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistMode {
    /// Append each record as soon as its asset finishes
    #[default]
    StreamingAppend,
    /// Write the whole store at the end of the run
    BatchRewrite,
}

impl FromStr for PersistMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" | "stream" | "streaming" => Ok(PersistMode::StreamingAppend),
            "rewrite" | "batch" => Ok(PersistMode::BatchRewrite),
            other => Err(format!("unknown persist mode '{other}'")),
        }
    }
}

impl fmt::Display for PersistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistMode::StreamingAppend => write!(f, "append"),
            PersistMode::BatchRewrite => write!(f, "rewrite"),
        }
    }
}

/// The column set of a store: `Image` followed by hash columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    algorithms: Vec<HashAlgorithmKind>,
}

impl RecordSchema {
    /// Schema for a run; algorithms are put in canonical order.
    pub fn new(algorithms: &[HashAlgorithmKind]) -> Self {
        Self {
            algorithms: canonical_order(algorithms),
        }
    }

    /// Parse a header row. Columns keep the order they appear in.
    pub fn from_header(fields: &[String]) -> Result<Self, String> {
        let (first, rest) = fields
            .split_first()
            .ok_or_else(|| "header row is empty".to_string())?;

        if !first.trim().eq_ignore_ascii_case(IMAGE_COLUMN) {
            return Err(format!(
                "first column must be '{IMAGE_COLUMN}', found '{first}'"
            ));
        }

        let mut algorithms = Vec::with_capacity(rest.len());
        for column in rest {
            let kind = HashAlgorithmKind::from_str(column).map_err(|e| e.to_string())?;
            if algorithms.contains(&kind) {
                return Err(format!("column '{column}' appears twice"));
            }
            algorithms.push(kind);
        }

        Ok(Self { algorithms })
    }

    pub fn algorithms(&self) -> &[HashAlgorithmKind] {
        &self.algorithms
    }

    /// Number of columns including `Image`
    pub fn width(&self) -> usize {
        self.algorithms.len() + 1
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once(IMAGE_COLUMN.to_string())
            .chain(self.algorithms.iter().map(|a| a.column_name().to_string()))
            .collect()
    }

    /// Fields for one record. A missing hash becomes an empty field.
    ///
    /// The pipeline never produces records for non-UTF-8 paths; one built
    /// by hand is written lossily and logged.
    pub fn row(&self, record: &HashRecord) -> Vec<String> {
        let path = match record.asset_path.to_str() {
            Some(path) => path.to_string(),
            None => {
                tracing::warn!(
                    path = %record.asset_path.display(),
                    "non-UTF-8 path written lossily"
                );
                record.asset_path.to_string_lossy().into_owned()
            }
        };
        std::iter::once(path)
            .chain(self.algorithms.iter().map(|a| {
                record
                    .hash(*a)
                    .map(|h| h.as_str().to_string())
                    .unwrap_or_default()
            }))
            .collect()
    }

    /// Same columns, order ignored
    pub fn same_columns(&self, other: &RecordSchema) -> bool {
        canonical_order(&self.algorithms) == canonical_order(&other.algorithms)
    }

    pub(crate) fn describe(&self) -> String {
        self.header().join(", ")
    }
}

/// A record store file on disk
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    events: EventSender,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            events: null_sender(),
        }
    }

    /// Report header writes, commits and malformed rows here
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a writer for one run
    pub fn open_writer(
        &self,
        mode: PersistMode,
        schema: RecordSchema,
    ) -> Result<Box<dyn RecordWriter>, StoreError> {
        let writer: Box<dyn RecordWriter> = match mode {
            PersistMode::StreamingAppend => Box::new(StreamingAppendWriter::open_with_events(
                &self.path,
                schema,
                self.events.clone(),
            )?),
            PersistMode::BatchRewrite => Box::new(
                BatchRewriteWriter::new(&self.path, schema).with_events(self.events.clone()),
            ),
        };
        Ok(writer)
    }

    /// Load every well-formed record
    pub fn load(&self) -> Result<LoadReport, StoreError> {
        reader::load_with_events(&self.path, &self.events)
    }

    /// Replace the store with `records`, in the given order
    pub fn write_all(&self, schema: RecordSchema, records: &[HashRecord]) -> Result<usize, StoreError> {
        let mut writer =
            BatchRewriteWriter::new(&self.path, schema).with_events(self.events.clone());
        for (index, record) in records.iter().enumerate() {
            writer.accept(index, record)?;
        }
        writer.finish()
    }
}
