//! Network Sink - Partitioned Batch Publishing
//!
//! Groups events by a partition key, packs each partition into size-bounded
//! batches and hands every batch to a [`Transport`]. The HTTP transport posts
//! an Event Hubs style JSON array of envelopes to `{endpoint}/{hub}/messages`.
//!
//! Delivery is at-most-once per call: a rejected batch is logged and counted
//! as failed, never retried.

use crate::error::{SinkError, TransportError};
use crate::event::{DEFAULT_PARTITION_KEY_FIELD, Event, FIELD_EVENT_TYPE};
use crate::publisher::{PublishOutcome, Publisher};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_BATCH_BYTES: usize = 1_048_576;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Environment variable consulted when no token is configured
pub const TOKEN_ENV_VAR: &str = "FABRIQUE_SINK_TOKEN";

const BATCH_CONTENT_TYPE: &str = "application/vnd.microsoft.servicebus.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSinkConfig {
    pub endpoint: String,
    pub hub_name: String,
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_batch_bytes() -> usize {
    DEFAULT_MAX_BATCH_BYTES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for NetworkSinkConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            hub_name: String::new(),
            auth_token: None,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl NetworkSinkConfig {
    /// Fill a missing token from [`TOKEN_ENV_VAR`]
    pub fn with_env_token(mut self) -> Self {
        if self.auth_token.is_none() {
            self.auth_token = std::env::var(TOKEN_ENV_VAR)
                .ok()
                .filter(|t| !t.trim().is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<(), SinkError> {
        if self.endpoint.trim().is_empty() {
            return Err(SinkError::MissingParameter("endpoint"));
        }
        if self.hub_name.trim().is_empty() {
            return Err(SinkError::MissingParameter("hub_name"));
        }
        // "[" + "]" plus at least one byte of payload
        if self.max_batch_bytes < 3 {
            return Err(SinkError::InvalidParameter {
                name: "max_batch_bytes",
                reason: format!("{} is too small to hold any event", self.max_batch_bytes),
            });
        }
        if self.timeout_ms == 0 {
            return Err(SinkError::InvalidParameter {
                name: "timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Delivers one packed batch. `envelopes` are already-encoded JSON objects
/// that the transport joins into a JSON array.
pub trait Transport: Send {
    fn send_batch(&mut self, partition_key: &str, envelopes: &[String]) -> Result<(), TransportError>;
}

/// Blocking HTTP transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &NetworkSinkConfig) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;

        let url = format!(
            "{}/{}/messages",
            config.endpoint.trim_end_matches('/'),
            config.hub_name
        );
        info!(url = %url, "Network sink ready");

        Ok(Self {
            client,
            url,
            auth_token: config.auth_token.clone(),
        })
    }
}

impl Transport for HttpTransport {
    fn send_batch(&mut self, partition_key: &str, envelopes: &[String]) -> Result<(), TransportError> {
        let body = format!("[{}]", envelopes.join(","));

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(body);
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, token.as_str());
        }

        let response = request
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(partition = partition_key, count = envelopes.len(), "Batch delivered");
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            })
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<'a> {
    body: &'a str,
    broker_properties: BrokerProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BrokerProperties<'a> {
    partition_key: &'a str,
}

fn encode_envelope(event: &Event, partition_key: &str) -> Result<String, serde_json::Error> {
    let body = event.encode()?;
    serde_json::to_string(&Envelope {
        body: &body,
        broker_properties: BrokerProperties { partition_key },
    })
}

// ============================================================================
// Partition arena
// ============================================================================

struct PartitionSlot {
    key: String,
    envelopes: Vec<String>,
    /// Index of each envelope's event in the published slice
    events: Vec<usize>,
}

/// Per-call grouping storage. Slots keep their allocations across calls;
/// `reset` forgets every key so no partition leaks into the next call.
#[derive(Default)]
struct BatchArena {
    slots: Vec<PartitionSlot>,
    used: usize,
    index: HashMap<String, usize>,
}

impl BatchArena {
    fn slot_mut(&mut self, key: &str) -> &mut PartitionSlot {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.used;
                if idx == self.slots.len() {
                    self.slots.push(PartitionSlot {
                        key: String::new(),
                        envelopes: Vec::new(),
                        events: Vec::new(),
                    });
                }
                let slot = &mut self.slots[idx];
                slot.key.clear();
                slot.key.push_str(key);
                self.index.insert(key.to_string(), idx);
                self.used += 1;
                idx
            }
        };
        &mut self.slots[idx]
    }

    /// Occupied slots in first-seen order
    fn active(&self) -> &[PartitionSlot] {
        &self.slots[..self.used]
    }

    fn reset(&mut self) {
        for slot in &mut self.slots[..self.used] {
            slot.envelopes.clear();
            slot.events.clear();
        }
        self.used = 0;
        self.index.clear();
    }

    fn partitions(&self) -> usize {
        self.used
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Cumulative counters across all calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub batches: u64,
}

pub struct NetworkSink<T: Transport = HttpTransport> {
    config: NetworkSinkConfig,
    transport: T,
    arena: BatchArena,
    batch: Vec<String>,
    stats: SinkStats,
}

impl<T: Transport> NetworkSink<T> {
    pub fn new(config: NetworkSinkConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            arena: BatchArena::default(),
            batch: Vec::new(),
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Publish with full accounting of accepted, skipped and failed events
    pub fn publish_detailed(
        &mut self,
        events: &[Event],
        partition_key_field: Option<&str>,
    ) -> PublishOutcome {
        let field = partition_key_field.unwrap_or(DEFAULT_PARTITION_KEY_FIELD);
        let mut outcome = PublishOutcome::default();

        self.arena.reset();
        for (i, event) in events.iter().enumerate() {
            let key = event.partition_key(field);
            match encode_envelope(event, &key) {
                Ok(envelope) => {
                    let slot = self.arena.slot_mut(&key);
                    slot.envelopes.push(envelope);
                    slot.events.push(i);
                }
                Err(e) => {
                    warn!(partition = %key, error = %e, "Failed to encode event, skipping");
                    outcome.skipped += 1;
                }
            }
        }

        let Self {
            config,
            transport,
            arena,
            batch,
            stats,
        } = self;
        let max_bytes = config.max_batch_bytes;

        for slot in arena.active() {
            batch.clear();
            // "[]"
            let mut bytes = 2;

            for (envelope, &event_idx) in slot.envelopes.iter().zip(&slot.events) {
                if 2 + envelope.len() > max_bytes {
                    let kind = events[event_idx]
                        .get_str(FIELD_EVENT_TYPE)
                        .unwrap_or_else(|| events[event_idx].name());
                    warn!(
                        kind,
                        partition = %slot.key,
                        size = envelope.len(),
                        max_bytes,
                        "Event too large for an empty batch, skipping"
                    );
                    outcome.skipped += 1;
                    continue;
                }

                let separator = usize::from(!batch.is_empty());
                if bytes + separator + envelope.len() > max_bytes {
                    transmit(transport, &slot.key, batch, &mut outcome, stats);
                    bytes = 2;
                }

                bytes += usize::from(!batch.is_empty()) + envelope.len();
                batch.push(envelope.clone());
            }

            transmit(transport, &slot.key, batch, &mut outcome, stats);
        }

        debug!(
            partitions = arena.partitions(),
            accepted = outcome.accepted,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Publish complete"
        );

        stats.sent += outcome.accepted as u64;
        stats.skipped += outcome.skipped as u64;
        stats.failed += outcome.failed as u64;
        arena.reset();

        outcome
    }
}

/// Send and clear `batch`, recording the result in `outcome`
fn transmit<T: Transport>(
    transport: &mut T,
    partition_key: &str,
    batch: &mut Vec<String>,
    outcome: &mut PublishOutcome,
    stats: &mut SinkStats,
) {
    if batch.is_empty() {
        return;
    }

    let count = batch.len();
    match transport.send_batch(partition_key, batch) {
        Ok(()) => {
            outcome.accepted += count;
            stats.batches += 1;
        }
        Err(e) => {
            warn!(partition = partition_key, count, error = %e, "Batch not accepted");
            outcome.failed += count;
        }
    }
    batch.clear();
}

impl<T: Transport> Publisher for NetworkSink<T> {
    fn name(&self) -> &str {
        "network"
    }

    fn publish(&mut self, events: &[Event], partition_key_field: Option<&str>) -> usize {
        self.publish_detailed(events, partition_key_field).accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use serde_json::Value;
    use std::collections::HashSet;

    /// Keeps every batch in memory; partitions in `reject` fail
    #[derive(Default)]
    struct RecordingTransport {
        batches: Vec<(String, Vec<String>)>,
        reject: HashSet<String>,
    }

    impl Transport for RecordingTransport {
        fn send_batch(&mut self, partition_key: &str, envelopes: &[String]) -> Result<(), TransportError> {
            if self.reject.contains(partition_key) {
                return Err(TransportError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.batches
                .push((partition_key.to_string(), envelopes.to_vec()));
            Ok(())
        }
    }

    fn event(player: &str, seq: u32) -> Event {
        Event::builder(EventKind::GamePlay, format!("2026-01-01T00:00:{:02}Z", seq), player, "normal")
            .string("game", "slots")
            .money("bet_amount", 10.0)
            .balance(90.0)
            .build()
    }

    fn sink(max_batch_bytes: usize) -> NetworkSink<RecordingTransport> {
        let config = NetworkSinkConfig {
            endpoint: "http://localhost:1".to_string(),
            hub_name: "casino".to_string(),
            max_batch_bytes,
            ..Default::default()
        };
        NetworkSink::new(config, RecordingTransport::default())
    }

    fn envelope_len(e: &Event, field: &str) -> usize {
        encode_envelope(e, &e.partition_key(field)).unwrap().len()
    }

    #[test]
    fn test_groups_by_partition_in_first_seen_order() {
        let mut sink = sink(DEFAULT_MAX_BATCH_BYTES);
        let events = vec![event("a", 1), event("b", 2), event("a", 3)];

        assert_eq!(sink.publish(&events, None), 3);

        let batches = &sink.transport().batches;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, "a");
        assert_eq!(batches[0].1.len(), 2);
        assert_eq!(batches[1].0, "b");
        assert_eq!(sink.stats().batches, 2);
    }

    #[test]
    fn test_envelope_carries_body_and_partition() {
        let mut sink = sink(DEFAULT_MAX_BATCH_BYTES);
        sink.publish(&[event("a", 1)], None);

        let raw = &sink.transport().batches[0].1[0];
        let envelope: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope["BrokerProperties"]["PartitionKey"], "a");

        let body: Value = serde_json::from_str(envelope["Body"].as_str().unwrap()).unwrap();
        assert_eq!(body["event_type"], "game_play");
        assert_eq!(body["player_id"], "a");
    }

    #[test]
    fn test_splits_when_batch_is_full() {
        let events = vec![event("a", 1), event("a", 2), event("a", 3)];
        let len = envelope_len(&events[0], "player_id");
        // Room for exactly two envelopes plus brackets and one comma
        let mut sink = sink(2 + len * 2 + 1);

        assert_eq!(sink.publish(&events, None), 3);

        let sizes: Vec<usize> = sink.transport().batches.iter().map(|b| b.1.len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_oversized_event_is_skipped_and_counted() {
        let small = event("a", 1);
        let mut large = small.payload().clone();
        large.insert("note".to_string(), Value::from("x".repeat(4096)));
        let large = Event::from_row("game_play", large);

        let limit = envelope_len(&small, "player_id") + 10;
        let mut sink = sink(limit);
        let events = vec![small.clone(), large, small];

        let outcome = sink.publish_detailed(&events, None);
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.accepted + outcome.skipped, events.len());
    }

    #[test]
    fn test_rejected_batch_counts_as_failed() {
        let mut sink = sink(DEFAULT_MAX_BATCH_BYTES);
        sink.transport.reject.insert("b".to_string());
        let events = vec![event("a", 1), event("b", 2), event("b", 3)];

        let outcome = sink.publish_detailed(&events, None);
        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.total(), 3);
        assert_eq!(sink.stats().failed, 2);
    }

    #[test]
    fn test_partitions_do_not_leak_between_calls() {
        let mut sink = sink(DEFAULT_MAX_BATCH_BYTES);
        sink.publish(&[event("a", 1), event("b", 2)], None);
        sink.publish(&[event("c", 3)], None);

        let keys: Vec<&str> = sink.transport().batches.iter().map(|b| b.0.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(sink.transport().batches[2].1.len(), 1);
    }

    #[test]
    fn test_custom_partition_field() {
        let mut sink = sink(DEFAULT_MAX_BATCH_BYTES);
        let events = vec![event("a", 1), event("b", 2)];

        assert_eq!(sink.publish(&events, Some("game")), 2);
        assert_eq!(sink.transport().batches.len(), 1);
        assert_eq!(sink.transport().batches[0].0, "slots");
    }

    #[test]
    fn test_validate_rejects_missing_hub() {
        let config = NetworkSinkConfig {
            endpoint: "http://localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SinkError::MissingParameter("hub_name"))
        ));
    }
}
