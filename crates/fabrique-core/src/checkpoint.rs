//! Replay Checkpoint Persistence
//!
//! Stores the last successfully replayed source timestamp and the running
//! count of events sent. The file is `{"last_timestamp": ..., "events_sent": ...}`.
//! Writes go to a sibling temp file that is renamed over the target, so a
//! crash mid-write leaves the previous checkpoint intact.

use crate::error::CheckpointError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Serialized replay progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Timestamp of the last accepted source row
    #[serde(default)]
    pub last_timestamp: Option<String>,
    /// Events accepted across all runs
    #[serde(default)]
    pub events_sent: u64,
}

impl CheckpointState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record one accepted event
    pub fn advance(&mut self, timestamp: Option<&str>) {
        if let Some(ts) = timestamp {
            self.last_timestamp = Some(ts.to_string());
        }
        self.events_sent += 1;
    }

    /// Whether a row with `timestamp` was already replayed. Two numeric
    /// timestamps compare as numbers, anything else as text.
    pub fn covers(&self, timestamp: &str) -> bool {
        let Some(last) = self.last_timestamp.as_deref() else {
            return false;
        };
        match (parse_epoch(timestamp), parse_epoch(last)) {
            (Some(ts), Some(last)) => ts <= last,
            _ => timestamp <= last,
        }
    }
}

fn parse_epoch(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// File-backed checkpoint storage
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored state. A missing, unreadable or corrupt file yields
    /// the empty state.
    pub fn load(&self) -> CheckpointState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => CheckpointState::empty(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unusable checkpoint");
                CheckpointState::empty()
            }
        }
    }

    /// Load without fallback; `Ok(None)` when no checkpoint exists
    pub fn try_load(&self) -> Result<Option<CheckpointState>, CheckpointError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn save(&self, state: &CheckpointState) -> Result<(), CheckpointError> {
        let body = serde_json::to_string_pretty(state)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;

        let io_err = |source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(
            path = %self.path.display(),
            events_sent = state.events_sent,
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Remove the stored checkpoint. Removing a missing file is not an error.
    pub fn reset(&self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
