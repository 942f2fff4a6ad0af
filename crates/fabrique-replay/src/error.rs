//! Replay error types

use fabrique_core::CheckpointError;
use std::path::PathBuf;

/// Failures opening or decoding a replay source
#[derive(Debug)]
pub enum SourceError {
    Open { path: PathBuf, source: std::io::Error },
    Csv { path: PathBuf, reason: String },
    Json { path: PathBuf, reason: String },
    /// CSV delimiters must be a single ASCII character
    InvalidDelimiter(char),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "Cannot open source {}: {}", path.display(), source)
            }
            Self::Csv { path, reason } => write!(f, "Cannot read CSV {}: {}", path.display(), reason),
            Self::Json { path, reason } => {
                write!(f, "Cannot read JSON array {}: {}", path.display(), reason)
            }
            Self::InvalidDelimiter(c) => write!(f, "Invalid CSV delimiter {:?}", c),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that stop a replay before or while it runs
#[derive(Debug)]
pub enum ReplayError {
    /// Jitter percentage outside [0, 1)
    InvalidJitter(f64),
    Checkpoint(CheckpointError),
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJitter(pct) => {
                write!(f, "Jitter percentage must be in [0, 1), got {}", pct)
            }
            Self::Checkpoint(e) => write!(f, "Checkpoint error: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidJitter(_) => None,
            Self::Checkpoint(e) => Some(e),
        }
    }
}

impl From<CheckpointError> for ReplayError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}
