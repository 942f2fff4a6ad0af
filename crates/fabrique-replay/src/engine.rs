//! Replay Engine
//!
//! Reads a captured event log row by row and republishes each row as one
//! event. Progress is checkpointed after every accepted event, so a restarted
//! replay skips rows at or before the last checkpointed timestamp. A crash
//! between publish and save repeats at most that one event.

use crate::error::ReplayError;
use crate::jitter::{DEFAULT_JITTER_PERCENTAGE, Jitter};
use crate::source::{EventSource, Row};
use fabrique_core::event::FIELD_EVENT_TYPE;
use fabrique_core::telemetry::sleep_or_cancel;
use fabrique_core::{CheckpointState, CheckpointStore, Event, Publisher};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Event name for rows that carry no `event_type`
pub const REPLAY_EVENT_NAME: &str = "replay";

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub state_file: PathBuf,
    /// Pause after each accepted event
    pub delay_ms: u64,
    pub jitter: bool,
    /// Empty means auto-detect numeric fields
    pub jitter_fields: Vec<String>,
    pub jitter_percentage: f64,
    pub timestamp_field: String,
    /// None lets the publisher use its default partitioning
    pub partition_key_field: Option<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("state.json"),
            delay_ms: 100,
            jitter: false,
            jitter_fields: Vec::new(),
            jitter_percentage: DEFAULT_JITTER_PERCENTAGE,
            timestamp_field: "timestamp".to_string(),
            partition_key_field: Some("pseudo_player_id".to_string()),
        }
    }
}

impl ReplayConfig {
    /// Jitter settings, or None when jitter is off
    pub fn build_jitter(&self) -> Result<Option<Jitter>, ReplayError> {
        if !self.jitter {
            return Ok(None);
        }
        let mut excluded = vec![self.timestamp_field.clone()];
        excluded.extend(self.partition_key_field.iter().cloned());
        let jitter = Jitter::new(self.jitter_percentage, self.jitter_fields.clone())?;
        Ok(Some(jitter.excluding(excluded)))
    }
}

/// Outcome of one replay call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events accepted in this run
    pub sent: u64,
    /// Rows skipped as already replayed
    pub skipped: u64,
    /// Rows the publisher did not accept
    pub failed: u64,
    /// Checkpoint timestamp after the run
    pub last_timestamp: Option<String>,
    /// Events accepted across all runs sharing the checkpoint
    pub events_sent_total: u64,
    /// Accepted events the stored checkpoint does not cover because its
    /// last writes failed. A restart after a crash replays them again.
    pub unsaved: u64,
}

pub struct ReplayEngine<S: EventSource, P: Publisher> {
    source: S,
    publisher: P,
    store: CheckpointStore,
    jitter: Option<Jitter>,
    config: ReplayConfig,
    rng: StdRng,
    token: CancellationToken,
}

impl<S: EventSource, P: Publisher> ReplayEngine<S, P> {
    pub fn new(source: S, publisher: P, config: ReplayConfig) -> Result<Self, ReplayError> {
        let jitter = config.build_jitter()?;
        Ok(Self {
            source,
            publisher,
            store: CheckpointStore::new(config.state_file.clone()),
            jitter,
            config,
            rng: StdRng::from_rng(&mut rand::rng()),
            token: CancellationToken::new(),
        })
    }

    /// Fix the jitter stream
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Stop between events once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Replay rows until the source ends, `limit` events were accepted or
    /// the token is cancelled. `reset_state` discards the checkpoint first.
    pub fn replay(&mut self, limit: Option<u64>, reset_state: bool) -> Result<ReplaySummary, ReplayError> {
        let mut state = if reset_state {
            self.store.reset()?;
            info!(path = %self.store.path().display(), "Checkpoint reset");
            CheckpointState::empty()
        } else {
            self.store.load()
        };

        info!(
            source = self.source.name(),
            sink = self.publisher.name(),
            resume_after = state.last_timestamp.as_deref().unwrap_or("-"),
            jitter = self.jitter.as_ref().map_or(0.0, Jitter::percentage),
            "Replay starting"
        );

        let mut summary = ReplaySummary::default();
        let delay = Duration::from_millis(self.config.delay_ms);
        let start = Instant::now();

        while !limit.is_some_and(|l| summary.sent >= l) && !self.token.is_cancelled() {
            let Some(mut row) = self.source.next_row() else {
                break;
            };

            let timestamp = row_timestamp(&row, &self.config.timestamp_field);
            if timestamp.as_deref().is_some_and(|ts| state.covers(ts)) {
                summary.skipped += 1;
                continue;
            }

            if let Some(jitter) = &self.jitter {
                jitter.apply(&mut row, &mut self.rng);
            }

            let name = row
                .get(FIELD_EVENT_TYPE)
                .and_then(Value::as_str)
                .unwrap_or(REPLAY_EVENT_NAME)
                .to_string();
            let event = Event::from_row(name, row);
            let accepted = self.publisher.publish(
                std::slice::from_ref(&event),
                self.config.partition_key_field.as_deref(),
            );

            if accepted == 0 {
                summary.failed += 1;
                warn!(timestamp = timestamp.as_deref().unwrap_or("-"), "Event not accepted");
                continue;
            }

            state.advance(timestamp.as_deref());
            summary.sent += 1;
            match self.store.save(&state) {
                Ok(()) => summary.unsaved = 0,
                Err(e) => {
                    summary.unsaved += 1;
                    error!(error = %e, unsaved = summary.unsaved, "Failed to save checkpoint");
                }
            }
            debug!(
                sent = summary.sent,
                timestamp = timestamp.as_deref().unwrap_or("-"),
                "Replayed event"
            );

            sleep_or_cancel(&self.token, delay);
        }

        if self.token.is_cancelled() {
            info!("Replay interrupted");
        }

        summary.last_timestamp = state.last_timestamp;
        summary.events_sent_total = state.events_sent;

        if summary.unsaved > 0 {
            warn!(
                events = summary.unsaved,
                path = %self.store.path().display(),
                "Checkpoint lags behind accepted events"
            );
        }

        info!(
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            total = summary.events_sent_total,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Replay finished"
        );
        Ok(summary)
    }
}

/// Timestamp column as text; numbers are rendered as written
fn row_timestamp(row: &Row, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
