//! Fabrique Replay
//!
//! Republishes a captured event log through the same publishers the
//! simulator uses, with optional value jitter and a checkpoint that makes
//! restarts resume where the last run stopped.
//!
//! ```no_run
//! use fabrique_core::FileSink;
//! use fabrique_replay::{ReplayConfig, ReplayEngine, open_source};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = open_source("events.csv", ',')?;
//! let sink = FileSink::new("replayed.json")?;
//! let mut engine = ReplayEngine::new(source, sink, ReplayConfig::default())?;
//! let summary = engine.replay(Some(100), false)?;
//! println!("sent {} events", summary.sent);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod jitter;
pub mod source;

pub use engine::{ReplayConfig, ReplayEngine, ReplaySummary};
pub use error::{ReplayError, SourceError};
pub use jitter::Jitter;
pub use source::{CsvSource, EventSource, JsonArraySource, Row, open_source};
