//! Record writers, one per persist mode.

use super::codec::{encode_row, parse_rows, scan_row_boundary, write_row};
use super::RecordSchema;
use crate::core::hasher::HashRecord;
use crate::error::StoreError;
use crate::events::{null_sender, Event, EventSender, StoreEvent};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Sink for the successful records of a run.
///
/// The pipeline hands every record to exactly one writer from a single
/// thread, so implementations need no locking of their own.
pub trait RecordWriter: Send {
    /// Take one record. `index` is the asset's submission position.
    fn accept(&mut self, index: usize, record: &HashRecord) -> Result<(), StoreError>;

    /// Make every accepted record durable. Returns rows written.
    fn finish(&mut self) -> Result<usize, StoreError>;
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Appends each record to the store as it arrives.
///
/// The header is written only when the file is empty. Appending to a store
/// whose header names other columns is refused.
pub struct StreamingAppendWriter {
    path: PathBuf,
    file: File,
    schema: RecordSchema,
    rows: usize,
    events: EventSender,
}

impl StreamingAppendWriter {
    pub fn open(path: &Path, schema: RecordSchema) -> Result<Self, StoreError> {
        Self::open_with_events(path, schema, null_sender())
    }

    pub fn open_with_events(
        path: &Path,
        schema: RecordSchema,
        events: EventSender,
    ) -> Result<Self, StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(io_error(path))?;

        let len = file.metadata().map_err(io_error(path))?.len();

        let schema = if len == 0 {
            write_row(&mut file, &schema.header()).map_err(io_error(path))?;
            tracing::debug!(store = %path.display(), "wrote header");
            events.send(Event::Store(StoreEvent::HeaderWritten {
                store: path.to_path_buf(),
            }));
            schema
        } else {
            let existing = read_header(path, &file)?;
            if !existing.same_columns(&schema) {
                return Err(StoreError::SchemaMismatch {
                    path: path.to_path_buf(),
                    expected: schema.describe(),
                    found: existing.describe(),
                });
            }
            repair_tail(path, &file).map_err(io_error(path))?;
            // rows must line up with the columns already on disk
            existing
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            schema,
            rows: 0,
            events,
        })
    }

    /// Columns rows are written in
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }
}

fn read_header(path: &Path, file: &File) -> Result<RecordSchema, StoreError> {
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .map_err(io_error(path))?;

    let rows = parse_rows(&first_line);
    let fields = rows.first().map(|row| row.fields.as_slice()).unwrap_or(&[]);
    RecordSchema::from_header(fields).map_err(|reason| StoreError::InvalidHeader {
        path: path.to_path_buf(),
        reason,
    })
}

/// A previous run may have died mid-row.
///
/// A row cut inside a quoted field is dropped, otherwise the open quote
/// would swallow every row appended after it. Any other partial row is
/// terminated so the next row starts on a fresh line.
fn repair_tail(path: &Path, mut file: &File) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    let tail = scan_row_boundary(BufReader::new(file))?;
    if tail.partial() == 0 {
        return Ok(());
    }

    if tail.open_quote {
        tracing::warn!(
            store = %path.display(),
            bytes = tail.partial(),
            "dropping row cut inside a quoted field"
        );
        file.set_len(tail.complete)?;
    } else {
        tracing::warn!(store = %path.display(), "terminating partial last row");
        file.write_all(b"\n")?;
    }
    Ok(())
}

impl RecordWriter for StreamingAppendWriter {
    fn accept(&mut self, _index: usize, record: &HashRecord) -> Result<(), StoreError> {
        let line = encode_row(&self.schema.row(record));
        self.file
            .write_all(line.as_bytes())
            .map_err(io_error(&self.path))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, StoreError> {
        self.file.sync_data().map_err(io_error(&self.path))?;
        self.events.send(Event::Store(StoreEvent::Committed {
            store: self.path.clone(),
            rows: self.rows,
        }));
        Ok(self.rows)
    }
}

/// Collects records and replaces the store atomically on `finish`.
///
/// Rows come out in submission order whatever order assets finished in.
pub struct BatchRewriteWriter {
    path: PathBuf,
    schema: RecordSchema,
    pending: Vec<(usize, HashRecord)>,
    events: EventSender,
}

impl BatchRewriteWriter {
    pub fn new(path: &Path, schema: RecordSchema) -> Self {
        Self {
            path: path.to_path_buf(),
            schema,
            pending: Vec::new(),
            events: null_sender(),
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn write_to(&self, writer: impl Write) -> io::Result<()> {
        let mut writer = BufWriter::new(writer);
        write_row(&mut writer, &self.schema.header())?;
        for (_, record) in &self.pending {
            write_row(&mut writer, &self.schema.row(record))?;
        }
        writer.flush()
    }
}

impl RecordWriter for BatchRewriteWriter {
    fn accept(&mut self, index: usize, record: &HashRecord) -> Result<(), StoreError> {
        self.pending.push((index, record.clone()));
        Ok(())
    }

    fn finish(&mut self) -> Result<usize, StoreError> {
        self.pending.sort_by_key(|(index, _)| *index);

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut temp = NamedTempFile::new_in(dir).map_err(io_error(&self.path))?;
        self.write_to(temp.as_file_mut())
            .map_err(io_error(&self.path))?;
        // keep the mode of the store being replaced
        if let Ok(existing) = fs::metadata(&self.path) {
            temp.as_file()
                .set_permissions(existing.permissions())
                .map_err(io_error(&self.path))?;
        }
        temp.as_file().sync_all().map_err(io_error(&self.path))?;
        temp.persist(&self.path)
            .map_err(|e| io_error(&self.path)(e.error))?;

        let rows = self.pending.len();
        tracing::debug!(store = %self.path.display(), rows, "rewrote store");
        self.events.send(Event::Store(StoreEvent::HeaderWritten {
            store: self.path.clone(),
        }));
        self.events.send(Event::Store(StoreEvent::Committed {
            store: self.path.clone(),
            rows,
        }));
        Ok(rows)
    }
}
