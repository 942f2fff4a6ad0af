//! File Sink
//!
//! Stores events in a single JSON array file. Every call reads the whole
//! array, appends the batch and rewrites the file. Two processes writing the
//! same file can lose each other's updates; within one process the scheduler
//! serializes calls.

use crate::error::SinkError;
use crate::event::Event;
use crate::publisher::Publisher;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Open a file sink, creating the parent directory and an empty array
    /// if the file does not exist yet.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let storage = |source: io::Error| SinkError::Storage {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(storage)?;
            }
        }
        if !path.exists() {
            fs::write(&path, "[]").map_err(storage)?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents; missing, unreadable or unparseable files read as
    /// empty
    pub fn load(&self) -> Vec<Value> {
        self.read_stored().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Cannot read event file, treating as empty");
            Vec::new()
        })
    }

    /// Stored array. A missing file or a body that is not a JSON array is
    /// empty; any other read failure is an error so the file is not
    /// overwritten.
    fn read_stored(&self) -> io::Result<Vec<Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Event file is not a JSON array, starting empty");
                Ok(Vec::new())
            }
        }
    }

    fn append(&self, events: &[Event]) -> io::Result<()> {
        let mut stored = self.read_stored()?;
        stored.reserve(events.len());
        for event in events {
            stored.push(Value::Object(event.payload().clone()));
        }

        let body = serde_json::to_string_pretty(&stored).map_err(io::Error::other)?;
        fs::write(&self.path, body)
    }
}

impl Publisher for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn publish(&mut self, events: &[Event], _partition_key_field: Option<&str>) -> usize {
        if events.is_empty() {
            return 0;
        }

        match self.append(events) {
            Ok(()) => {
                debug!(count = events.len(), path = %self.path.display(), "Stored events");
                events.len()
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to store events");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn event(player: &str) -> Event {
        Event::builder(EventKind::Deposit, "2026-01-01T00:00:00Z", player, "normal")
            .money("amount", 50.0)
            .balance(150.0)
            .build()
    }

    #[test]
    fn test_creates_parent_and_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/events.json");
        let sink = FileSink::new(&path).unwrap();

        assert!(path.exists());
        assert!(sink.load().is_empty());
    }

    #[test]
    fn test_appends_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path().join("events.json")).unwrap();

        assert_eq!(sink.publish(&[event("a")], None), 1);
        assert_eq!(sink.publish(&[event("b"), event("c")], None), 2);

        let stored = sink.load();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0]["player_id"], "a");
        assert_eq!(stored[2]["player_id"], "c");
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "{not json").unwrap();

        let mut sink = FileSink::new(&path).unwrap();
        assert!(sink.load().is_empty());
        assert_eq!(sink.publish(&[event("a")], None), 1);
        assert_eq!(sink.load().len(), 1);
    }

    #[test]
    fn test_unwritable_target_accepts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let mut sink = FileSink::new(&path).unwrap();

        // Replacing the file with a directory makes the rewrite fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert_eq!(sink.publish(&[event("a")], None), 0);
    }

    #[test]
    fn test_unreadable_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let mut sink = FileSink::new(&path).unwrap();
        assert_eq!(sink.publish(&[event("a"), event("b")], None), 2);

        // Invalid UTF-8 in front of the stored array
        let mut bytes = vec![0xFF];
        bytes.extend(fs::read(&path).unwrap());
        fs::write(&path, &bytes).unwrap();

        assert_eq!(sink.publish(&[event("c")], None), 0);
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }
}
