//! Loading a record store back into memory.

use super::codec::parse_rows;
use super::RecordSchema;
use crate::core::hasher::{HashAlgorithmKind, HashRecord, HashString};
use crate::error::{MalformedRow, StoreError};
use crate::events::{null_sender, Event, EventSender, StoreEvent};
use std::fs;
use std::path::Path;

/// Everything a load produced
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Columns declared by the header
    pub schema: RecordSchema,
    /// Well-formed rows, in file order
    pub records: Vec<HashRecord>,
    /// Rows skipped because their width did not match the header
    pub malformed: Vec<MalformedRow>,
}

impl LoadReport {
    pub fn algorithms(&self) -> &[HashAlgorithmKind] {
        self.schema.algorithms()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a store from disk
pub fn load(path: &Path) -> Result<LoadReport, StoreError> {
    load_with_events(path, &null_sender())
}

pub(crate) fn load_with_events(path: &Path, events: &EventSender) -> Result<LoadReport, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = parse_rows(&text).into_iter();

    let Some(header) = rows.next() else {
        return Ok(LoadReport {
            schema: RecordSchema::new(&[]),
            records: Vec::new(),
            malformed: Vec::new(),
        });
    };

    let schema = RecordSchema::from_header(&header.fields).map_err(|reason| {
        StoreError::InvalidHeader {
            path: path.to_path_buf(),
            reason,
        }
    })?;

    let mut records = Vec::new();
    let mut malformed = Vec::new();

    for row in rows {
        if row.fields.len() != schema.width() {
            let problem = MalformedRow {
                line: row.line,
                expected: schema.width(),
                found: row.fields.len(),
            };
            tracing::warn!(store = %path.display(), "{problem}");
            events.send(Event::Store(StoreEvent::MalformedRow {
                store: path.to_path_buf(),
                line: row.line,
                message: problem.to_string(),
            }));
            malformed.push(problem);
            continue;
        }

        let mut fields = row.fields.into_iter();
        let mut record = HashRecord::new(fields.next().unwrap_or_default());
        for (algorithm, value) in schema.algorithms().iter().zip(fields) {
            if !value.is_empty() {
                record.insert(*algorithm, HashString::new(value));
            }
        }
        records.push(record);
    }

    tracing::debug!(
        store = %path.display(),
        records = records.len(),
        malformed = malformed.len(),
        "loaded store"
    );

    Ok(LoadReport {
        schema,
        records,
        malformed,
    })
}
