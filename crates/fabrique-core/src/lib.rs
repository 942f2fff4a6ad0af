//! Fabrique Core
//!
//! Shared plumbing for the casino event simulator and the replay tool:
//!
//! - [`event`]: the flat event record both producers emit
//! - [`publisher`]: the publish contract and sink selection
//! - [`file_sink`] / [`network_sink`]: the two sinks
//! - [`checkpoint`]: replay progress persistence
//! - [`telemetry`]: logging and Ctrl-C wiring for the binaries

pub mod checkpoint;
pub mod error;
pub mod event;
pub mod file_sink;
pub mod network_sink;
pub mod publisher;
pub mod telemetry;

pub use checkpoint::{CheckpointState, CheckpointStore};
pub use error::{CheckpointError, SinkError, TransportError};
pub use event::{Event, EventBuilder, EventKind};
pub use file_sink::FileSink;
pub use network_sink::{HttpTransport, NetworkSink, NetworkSinkConfig, SinkStats, Transport};
pub use publisher::{PublishOutcome, Publisher, SinkConfig, create_publisher};
