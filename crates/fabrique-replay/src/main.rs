//! fabrique-replay - Casino Event Replay
//!
//! Usage:
//!   fabrique-replay -f events.csv --output-file replayed.json
//!   fabrique-replay -f events.csv --endpoint https://ns.servicebus.windows.net --hub-name casino
//!   fabrique-replay -f casino_events.json --jitter --jitter-percentage 0.1 --limit 500

use clap::Parser;
use fabrique_core::network_sink::NetworkSinkConfig;
use fabrique_core::{SinkConfig, create_publisher, telemetry};
use fabrique_replay::source::DEFAULT_DELIMITER;
use fabrique_replay::{ReplayConfig, ReplayEngine, open_source};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "fabrique-replay")]
#[command(about = "Replay captured casino events to a sink")]
struct Cli {
    /// Source file: CSV with a header row, or a JSON array (.json)
    #[arg(short = 'f', long = "csv-file", alias = "input")]
    source: PathBuf,

    /// CSV field delimiter
    #[arg(long, default_value_t = DEFAULT_DELIMITER)]
    delimiter: char,

    /// Store events in this JSON array file
    #[arg(short, long, conflicts_with = "endpoint")]
    output_file: Option<PathBuf>,

    /// Network sink endpoint
    #[arg(long, requires = "hub_name")]
    endpoint: Option<String>,

    /// Event hub name on the network sink
    #[arg(short = 'n', long)]
    hub_name: Option<String>,

    /// Authorization token (falls back to FABRIQUE_SINK_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Column holding the event timestamp
    #[arg(short, long, default_value = "timestamp")]
    timestamp_field: String,

    /// Checkpoint file
    #[arg(short, long, default_value = "state.json")]
    state_file: PathBuf,

    /// Ignore and overwrite the existing checkpoint
    #[arg(long)]
    reset_state: bool,

    /// Seconds to wait after each event
    #[arg(short = 'd', long, default_value_t = 0.1)]
    replay_delay: f64,

    /// Stop after this many events
    #[arg(short, long)]
    limit: Option<u64>,

    /// Randomly perturb numeric fields
    #[arg(short, long)]
    jitter: bool,

    /// Fields to jitter (default: every numeric field)
    #[arg(long, num_args = 1..)]
    jitter_fields: Vec<String>,

    /// Maximum relative change, in [0, 1)
    #[arg(long, default_value_t = 0.05)]
    jitter_percentage: f64,

    /// Column used as the partition key
    #[arg(long, default_value = "pseudo_player_id")]
    partition_key_field: String,

    /// Seed for reproducible jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn replay_config(&self) -> Result<ReplayConfig, String> {
        if !self.replay_delay.is_finite() || self.replay_delay < 0.0 {
            return Err(format!("Invalid replay delay: {}", self.replay_delay));
        }
        Ok(ReplayConfig {
            state_file: self.state_file.clone(),
            delay_ms: (self.replay_delay * 1000.0).round() as u64,
            jitter: self.jitter,
            jitter_fields: self.jitter_fields.clone(),
            jitter_percentage: self.jitter_percentage,
            timestamp_field: self.timestamp_field.clone(),
            partition_key_field: Some(self.partition_key_field.clone()),
        })
    }

    fn sink_config(&self) -> SinkConfig {
        if let Some(endpoint) = &self.endpoint {
            SinkConfig::Network(NetworkSinkConfig {
                endpoint: endpoint.clone(),
                hub_name: self.hub_name.clone().unwrap_or_default(),
                auth_token: self.token.clone(),
                ..Default::default()
            })
        } else if let Some(path) = &self.output_file {
            SinkConfig::File { path: path.clone() }
        } else {
            SinkConfig::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Replay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.replay_config()?;
    let source = open_source(&cli.source, cli.delimiter)?;
    let publisher = create_publisher(&cli.sink_config())?;

    let token = CancellationToken::new();
    let signal = match telemetry::cancel_on_ctrl_c(token.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Ctrl-C handling unavailable");
            None
        }
    };

    let mut engine = ReplayEngine::new(source, publisher, config)?.with_cancellation(token.clone());
    if let Some(seed) = cli.seed {
        engine = engine.with_seed(seed);
    }

    let result = engine.replay(cli.limit, cli.reset_state);

    token.cancel();
    if let Some(handle) = signal {
        let _ = handle.join();
    }

    let summary = result?;
    info!(
        sent = summary.sent,
        last_timestamp = summary.last_timestamp.as_deref().unwrap_or("-"),
        "Replay complete"
    );
    Ok(())
}
