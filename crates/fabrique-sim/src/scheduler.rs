//! Simulation Scheduler
//!
//! Splits the population into shards and runs one named worker thread per
//! shard. Each worker owns its players and a seeded generator, simulates
//! sessions for randomly picked players, buffers the events and flushes them
//! through the shared publisher once the buffer reaches the batch threshold.
//!
//! ```text
//!   population ──partition──► shard 0 ─► worker 0 ─┐
//!                             shard 1 ─► worker 1 ─┼─► Mutex<Publisher>
//!                             ...                  │
//!                             shard k ─► worker k ─┘   Mutex<SimulationTotals>
//! ```
//!
//! Shutdown is cooperative: the run ends when the duration elapses or the
//! token is cancelled elsewhere, workers flush what they hold, and the
//! scheduler waits at most `join_timeout` per worker.

use crate::error::SchedulerError;
use crate::player::Player;
use crate::session::simulate_session;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use fabrique_core::event::DEFAULT_PARTITION_KEY_FIELD;
use fabrique_core::telemetry::sleep_or_cancel;
use fabrique_core::{Event, Publisher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Hard ceiling on worker threads
pub const MAX_WORKERS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Requested workers, capped at [`MAX_WORKERS`]
    pub workers: usize,
    pub duration_secs: u64,
    /// Buffered events that trigger a flush
    pub batch_threshold: usize,
    pub min_pause_ms: u64,
    pub max_pause_ms: u64,
    /// Wait per worker during shutdown
    pub join_timeout_ms: u64,
    pub progress_interval_secs: u64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
    pub partition_key_field: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            duration_secs: 3600,
            batch_threshold: 10,
            min_pause_ms: 100,
            max_pause_ms: 1000,
            join_timeout_ms: 1000,
            progress_interval_secs: 10,
            seed: None,
            partition_key_field: DEFAULT_PARTITION_KEY_FIELD.to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn effective_workers(&self) -> usize {
        self.workers.min(MAX_WORKERS)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Counters shared by all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationTotals {
    pub generated: u64,
    pub sent: u64,
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub generated: u64,
    pub sent: u64,
    pub shard_sizes: Vec<usize>,
    /// Workers that did not report back within the join timeout
    pub workers_timed_out: usize,
    pub elapsed: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Split `n` players into contiguous index ranges for up to `workers`
/// shards.
///
/// Ranges of `max(1, n / workers)` are cut first; while there are fewer
/// ranges than workers, the largest (first on ties) is halved and its upper
/// half appended. When `n` is not a multiple of the chunk size the initial
/// cut can already yield more ranges than workers; those are kept as is.
pub fn partition_shards(n: usize, workers: usize) -> Vec<Range<usize>> {
    if n == 0 || workers == 0 {
        return Vec::new();
    }

    let per = (n / workers).max(1);
    let mut shards: Vec<Range<usize>> = (0..n)
        .step_by(per)
        .map(|start| start..(start + per).min(n))
        .collect();

    while shards.len() < workers {
        let mut largest = 0;
        for (i, shard) in shards.iter().enumerate() {
            if shard.len() > shards[largest].len() {
                largest = i;
            }
        }

        let shard = shards[largest].clone();
        if shard.len() <= 1 {
            break;
        }
        let mid = shard.start + shard.len() / 2;
        shards[largest] = shard.start..mid;
        shards.push(mid..shard.end);
    }

    shards
}

/// Reports the worker id on drop, so panicking workers are seen too
struct DoneSignal {
    id: usize,
    tx: Sender<usize>,
}

impl Drop for DoneSignal {
    fn drop(&mut self) {
        let _ = self.tx.send(self.id);
    }
}

struct ShardWorker<P: Publisher> {
    id: usize,
    players: Vec<Player>,
    rng: StdRng,
    publisher: Arc<Mutex<P>>,
    totals: Arc<Mutex<SimulationTotals>>,
    token: CancellationToken,
    config: SchedulerConfig,
    buffer: Vec<Event>,
}

impl<P: Publisher + 'static> ShardWorker<P> {
    fn spawn(self, done: Sender<usize>) -> std::io::Result<thread::JoinHandle<()>> {
        let id = self.id;
        thread::Builder::new()
            .name(format!("fabrique-worker-{}", id))
            .spawn(move || {
                let _done = DoneSignal { id, tx: done };
                let mut worker = self;
                worker.run();
                info!(worker = id, "Worker stopped");
            })
    }

    fn run(&mut self) {
        debug!(worker = self.id, players = self.players.len(), "Worker active");

        let (min_pause, max_pause) = if self.config.min_pause_ms <= self.config.max_pause_ms {
            (self.config.min_pause_ms, self.config.max_pause_ms)
        } else {
            (self.config.max_pause_ms, self.config.min_pause_ms)
        };

        while !self.token.is_cancelled() {
            let idx = self.rng.random_range(0..self.players.len());
            let events = simulate_session(&mut self.players[idx], &mut self.rng);
            self.buffer.extend(events);

            if self.buffer.len() >= self.config.batch_threshold {
                self.flush();
            }

            let pause_ms = self.rng.random_range(min_pause..=max_pause);
            sleep_or_cancel(&self.token, Duration::from_millis(pause_ms));
        }

        self.flush();
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let generated = self.buffer.len();
        let field = self.config.partition_key_field.as_str();
        let sent = lock(&self.publisher).publish(&self.buffer, Some(field));

        {
            let mut totals = lock(&self.totals);
            totals.generated += generated as u64;
            totals.sent += sent as u64;
        }

        if sent != generated {
            warn!(worker = self.id, sent, generated, "Not all events were sent");
        } else {
            debug!(worker = self.id, sent, "Flushed events");
        }
        self.buffer.clear();
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    fn worker_rng(&self, worker: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => {
                let salt = (worker as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15);
                StdRng::seed_from_u64(seed ^ salt)
            }
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Run the population until the duration elapses or `token` is
    /// cancelled. The token is always cancelled when this returns.
    pub fn run<P: Publisher + 'static>(
        &self,
        players: Vec<Player>,
        publisher: Arc<Mutex<P>>,
        token: CancellationToken,
    ) -> Result<SimulationReport, SchedulerError> {
        if self.config.workers == 0 {
            return Err(SchedulerError::NoWorkers);
        }
        if players.is_empty() {
            return Err(SchedulerError::EmptyPopulation);
        }

        let workers = self.config.effective_workers();
        if workers < self.config.workers {
            warn!(requested = self.config.workers, workers, "Worker count capped");
        }

        let shards = partition_shards(players.len(), workers);
        let shard_sizes: Vec<usize> = shards.iter().map(|r| r.len()).collect();
        let mut slots: Vec<Option<Player>> = players.into_iter().map(Some).collect();

        info!(
            players = slots.len(),
            workers = shards.len(),
            duration_secs = self.config.duration_secs,
            "Starting casino simulation"
        );

        let start = Instant::now();
        let totals = Arc::new(Mutex::new(SimulationTotals::default()));
        let (done_tx, done_rx) = bounded::<usize>(shards.len());
        let mut handles = HashMap::with_capacity(shards.len());

        for (id, range) in shards.iter().enumerate() {
            let worker = ShardWorker {
                id,
                players: range.clone().filter_map(|i| slots[i].take()).collect(),
                rng: self.worker_rng(id),
                publisher: Arc::clone(&publisher),
                totals: Arc::clone(&totals),
                token: token.clone(),
                config: self.config.clone(),
                buffer: Vec::with_capacity(self.config.batch_threshold),
            };

            match worker.spawn(done_tx.clone()) {
                Ok(handle) => {
                    handles.insert(id, handle);
                }
                Err(e) => {
                    error!(worker = id, error = %e, "Failed to spawn worker");
                    token.cancel();
                    return Err(SchedulerError::Spawn(e));
                }
            }
        }
        drop(done_tx);
        info!(workers = handles.len(), "Simulation threads started");

        self.wait(&token, start, &totals);
        token.cancel();
        info!("Stopping workers");

        let join_timeout = Duration::from_millis(self.config.join_timeout_ms);
        for _ in 0..shards.len() {
            match done_rx.recv_timeout(join_timeout) {
                Ok(id) => {
                    if let Some(handle) = handles.remove(&id) {
                        if handle.join().is_err() {
                            error!(worker = id, "Worker panicked");
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let workers_timed_out = handles.len();
        if workers_timed_out > 0 {
            // Dropping the handles detaches the threads
            warn!(workers = workers_timed_out, "Workers did not stop in time");
        }

        let final_totals = *lock(&totals);
        let report = SimulationReport {
            generated: final_totals.generated,
            sent: final_totals.sent,
            shard_sizes,
            workers_timed_out,
            elapsed: start.elapsed(),
        };

        info!(
            generated = report.generated,
            sent = report.sent,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Simulation complete"
        );
        Ok(report)
    }

    /// Block until the duration elapses or the token is cancelled, logging
    /// progress on the way
    fn wait(&self, token: &CancellationToken, start: Instant, totals: &Mutex<SimulationTotals>) {
        let deadline = start + self.config.duration();
        let interval = Duration::from_secs(self.config.progress_interval_secs.max(1));
        let mut next_progress = start + interval;

        while !token.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if now >= next_progress {
                let snapshot = *lock(totals);
                info!(
                    elapsed_secs = now.duration_since(start).as_secs(),
                    duration_secs = self.config.duration_secs,
                    generated = snapshot.generated,
                    sent = snapshot.sent,
                    "Simulation progress"
                );
                next_progress += interval;
            }
            sleep_or_cancel(token, deadline.min(next_progress) - now);
        }
    }
}
