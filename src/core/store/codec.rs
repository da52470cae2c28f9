//! Comma-separated row encoding.
//!
//! Fields containing a comma, a double quote or a line break are wrapped in
//! double quotes with inner quotes doubled, so image paths may contain any
//! of those characters and still round-trip.

use std::io::{self, Read, Write};

/// Write one row, terminated by `\n`
pub fn write_row<W: Write, S: AsRef<str>>(mut writer: W, fields: &[S]) -> io::Result<()> {
    writer.write_all(encode_row(fields).as_bytes())
}

/// Encode one row including its trailing newline
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        push_field(&mut line, field.as_ref());
    }
    line.push('\n');
    line
}

fn push_field(line: &mut String, field: &str) {
    if !field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        line.push_str(field);
        return;
    }
    line.push('"');
    for c in field.chars() {
        if c == '"' {
            line.push('"');
        }
        line.push(c);
    }
    line.push('"');
}

/// One decoded row and the line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// 1-based
    pub line: usize,
    pub fields: Vec<String>,
}

/// Decode every non-blank row of `text`.
///
/// Quoted fields may span lines. `\r\n` endings are accepted. An
/// unterminated quote at end of input keeps whatever was read.
pub fn parse_rows(text: &str) -> Vec<ParsedRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut line = 1;
    let mut row_start = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !was_quoted => {
                in_quotes = true;
                was_quoted = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                was_quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                finish_row(&mut rows, &mut fields, row_start, was_quoted);
                was_quoted = false;
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() || was_quoted {
        fields.push(field);
        finish_row(&mut rows, &mut fields, row_start, was_quoted);
    }

    rows
}

fn finish_row(rows: &mut Vec<ParsedRow>, fields: &mut Vec<String>, line: usize, quoted: bool) {
    let blank = fields.len() == 1 && fields[0].is_empty() && !quoted;
    let fields = std::mem::take(fields);
    if !blank {
        rows.push(ParsedRow { line, fields });
    }
}

/// How a stream of encoded rows ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowBoundary {
    /// Bytes scanned
    pub len: u64,
    /// Offset just past the last row terminator outside quotes
    pub complete: u64,
    /// The stream stopped inside a quoted field
    pub open_quote: bool,
}

impl RowBoundary {
    /// Bytes after the last complete row
    pub fn partial(&self) -> u64 {
        self.len - self.complete
    }
}

/// Find where the last complete row ends.
///
/// Doubled quotes toggle twice, so tracking quote parity byte by byte is
/// enough for anything [`encode_row`] produces.
pub(crate) fn scan_row_boundary<R: Read>(mut reader: R) -> io::Result<RowBoundary> {
    let mut buffer = [0u8; 8 * 1024];
    let mut state = RowBoundary {
        len: 0,
        complete: 0,
        open_quote: false,
    };
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        for &byte in &buffer[..read] {
            state.len += 1;
            match byte {
                b'"' => state.open_quote = !state.open_quote,
                b'\n' if !state.open_quote => state.complete = state.len,
                _ => {}
            }
        }
    }
    Ok(state)
}
