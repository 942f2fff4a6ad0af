//! Replay sources
//!
//! A source yields rows in file order, each a flat map from column name to
//! value. CSV files need a header row and give string values; JSON files hold
//! an array of objects (the FileSink format) and keep their value types.

use crate::error::SourceError;
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub type Row = Map<String, Value>;

pub const DEFAULT_DELIMITER: char = ',';

/// Ordered producer of replay rows
pub trait EventSource {
    /// Where the rows come from, for logging
    fn name(&self) -> &str;

    /// Next row, or None once the source is exhausted
    fn next_row(&mut self) -> Option<Row>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_row(&mut self) -> Option<Row> {
        (**self).next_row()
    }
}

// ============================================================================
// CSV
// ============================================================================

pub struct CsvSource {
    name: String,
    reader: csv::Reader<File>,
    headers: StringRecord,
    record: StringRecord,
    line: u64,
}

impl CsvSource {
    pub fn open(path: impl AsRef<Path>, delimiter: char) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if !delimiter.is_ascii() {
            return Err(SourceError::InvalidDelimiter(delimiter));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;
        let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();

        debug!(path = %path.display(), columns = headers.len(), "Opened CSV source");
        Ok(Self {
            name: path.display().to_string(),
            reader,
            headers,
            record: StringRecord::new(),
            line: 1,
        })
    }
}

fn csv_error(path: &Path, e: csv::Error) -> SourceError {
    match e.into_kind() {
        csv::ErrorKind::Io(source) => SourceError::Open {
            path: path.to_path_buf(),
            source,
        },
        other => SourceError::Csv {
            path: path.to_path_buf(),
            reason: format!("{:?}", other),
        },
    }
}

impl EventSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_row(&mut self) -> Option<Row> {
        loop {
            self.line += 1;
            match self.reader.read_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) => {
                    // Short rows leave trailing columns absent
                    let row = self
                        .headers
                        .iter()
                        .zip(self.record.iter())
                        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                        .collect();
                    return Some(row);
                }
                Err(e) if e.is_io_error() => {
                    error!(source = %self.name, line = self.line, error = %e, "Stopped reading source");
                    return None;
                }
                Err(e) => {
                    warn!(source = %self.name, line = self.line, error = %e, "Skipping malformed row");
                }
            }
        }
    }
}

// ============================================================================
// JSON array
// ============================================================================

pub struct JsonArraySource {
    name: String,
    rows: std::vec::IntoIter<Row>,
}

impl JsonArraySource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let values: Vec<Value> = serde_json::from_str(&raw).map_err(|e| SourceError::Json {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let total = values.len();
        let rows: Vec<Row> = values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect();
        if rows.len() < total {
            warn!(
                path = %path.display(),
                skipped = total - rows.len(),
                "Ignoring array elements that are not objects"
            );
        }

        Ok(Self::from_rows(path.display().to_string(), rows))
    }

    /// Source over rows already in memory
    pub fn from_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows: rows.into_iter(),
        }
    }
}

impl EventSource for JsonArraySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_row(&mut self) -> Option<Row> {
        self.rows.next()
    }
}

/// Open `path` as a JSON array when it ends in `.json`, as CSV otherwise
pub fn open_source(
    path: impl AsRef<Path>,
    delimiter: char,
) -> Result<Box<dyn EventSource + Send>, SourceError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(Box::new(JsonArraySource::open(&path)?))
    } else {
        Ok(Box::new(CsvSource::open(&path, delimiter)?))
    }
}
