//! Publisher Contract
//!
//! A publisher accepts an ordered batch of events and reports how many were
//! durably accepted. Implementations are chosen once from a [`SinkConfig`]
//! and used through the trait afterwards.
//!
//! Publishers take `&mut self`: neither the file rewrite nor the network
//! partition bookkeeping tolerates concurrent calls, so shared use goes
//! through a single lock.

use crate::error::SinkError;
use crate::event::Event;
use crate::file_sink::FileSink;
use crate::network_sink::{HttpTransport, NetworkSink, NetworkSinkConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Trait for event sinks
pub trait Publisher: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Publish `events`, grouping by `partition_key_field` where the sink
    /// supports partitions. Returns the number of events accepted.
    fn publish(&mut self, events: &[Event], partition_key_field: Option<&str>) -> usize;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(&mut self, events: &[Event], partition_key_field: Option<&str>) -> usize {
        (**self).publish(events, partition_key_field)
    }
}

/// Per-call accounting. `accepted + skipped + failed` always equals the
/// number of events handed to the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Transmitted or stored
    pub accepted: usize,
    /// Could not be encoded, or too large for an empty batch
    pub skipped: usize,
    /// Belonged to a batch the sink refused or never received
    pub failed: usize,
}

impl PublishOutcome {
    pub fn total(&self) -> usize {
        self.accepted + self.skipped + self.failed
    }

    pub fn absorb(&mut self, other: PublishOutcome) {
        self.accepted += other.accepted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Sink selection, usually read from the config file or CLI flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    File { path: PathBuf },
    Network(NetworkSinkConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::File {
            path: PathBuf::from("casino_events.json"),
        }
    }
}

/// Create a publisher from configuration.
/// Configuration problems are fatal here, before any run starts.
pub fn create_publisher(config: &SinkConfig) -> Result<Box<dyn Publisher>, SinkError> {
    match config {
        SinkConfig::File { path } => Ok(Box::new(FileSink::new(path)?)),
        SinkConfig::Network(net) => {
            let net = net.clone().with_env_token();
            net.validate()?;
            let transport = HttpTransport::new(&net)?;
            Ok(Box::new(NetworkSink::new(net, transport)))
        }
    }
}
