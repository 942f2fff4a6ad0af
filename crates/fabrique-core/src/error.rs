//! Error types shared by publishers and checkpoint storage

use std::path::PathBuf;

/// Errors raised while constructing a publisher.
/// Runtime publish failures never surface here; they reduce to counts.
#[derive(Debug)]
pub enum SinkError {
    /// A required network sink parameter is missing or empty
    MissingParameter(&'static str),
    /// A parameter is present but unusable
    InvalidParameter { name: &'static str, reason: String },
    /// The file sink could not prepare its storage location
    Storage { path: PathBuf, source: std::io::Error },
    /// The HTTP client could not be built
    Client(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParameter(name) => write!(f, "Missing sink parameter: {}", name),
            Self::InvalidParameter { name, reason } => {
                write!(f, "Invalid sink parameter {}: {}", name, reason)
            }
            Self::Storage { path, source } => {
                write!(f, "Cannot prepare storage at {}: {}", path.display(), source)
            }
            Self::Client(e) => write!(f, "HTTP client setup failed: {}", e),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure to transmit one batch
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The sink answered with a non-success status
    Rejected { status: u16, body: String },
    /// Connection, timeout or protocol failure
    Request(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { status, body } => write!(f, "Sink rejected batch ({}): {}", status, body),
            Self::Request(e) => write!(f, "Request failed: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors that can occur during checkpoint operations
#[derive(Debug)]
pub enum CheckpointError {
    SerializationFailed(String),
    Io { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializationFailed(e) => write!(f, "Serialization failed: {}", e),
            Self::Io { path, source } => {
                write!(f, "Checkpoint I/O on {} failed: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::SerializationFailed(_) => None,
        }
    }
}
