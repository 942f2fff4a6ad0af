//! fabrique-sim - Casino Event Simulator
//!
//! Usage:
//!   fabrique-sim --output-file casino_events.json --duration 60
//!   fabrique-sim --endpoint https://ns.servicebus.windows.net --hub-name casino
//!   fabrique-sim --config sim.json --threads 8 --seed 42

use clap::Parser;
use fabrique_core::network_sink::NetworkSinkConfig;
use fabrique_core::{Publisher, SinkConfig, create_publisher, telemetry};
use fabrique_sim::{ProfileType, Scheduler, SimulationConfig, build_population};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "fabrique-sim")]
#[command(about = "Simulate casino players and generate events")]
struct Cli {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

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

    #[arg(long)]
    normal_players: Option<usize>,

    #[arg(long)]
    high_roller_players: Option<usize>,

    #[arg(long)]
    occasional_players: Option<usize>,

    #[arg(long)]
    addict_players: Option<usize>,

    #[arg(long)]
    bonus_hunter_players: Option<usize>,

    #[arg(long)]
    fraudster_players: Option<usize>,

    /// Duration in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Worker threads (max 100)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Seed for a reproducible population and worker streams
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut SimulationConfig) {
        let counts = [
            (ProfileType::Normal, self.normal_players),
            (ProfileType::HighRoller, self.high_roller_players),
            (ProfileType::Occasional, self.occasional_players),
            (ProfileType::Addictive, self.addict_players),
            (ProfileType::BonusHunter, self.bonus_hunter_players),
            (ProfileType::Fraudster, self.fraudster_players),
        ];
        for (profile_type, count) in counts {
            if let Some(count) = count {
                config.population.set(profile_type, count);
            }
        }

        if let Some(duration) = self.duration {
            config.scheduler.duration_secs = duration;
        }
        if let Some(threads) = self.threads {
            config.scheduler.workers = threads;
        }
        if self.seed.is_some() {
            config.scheduler.seed = self.seed;
        }

        if let Some(endpoint) = &self.endpoint {
            config.sink = SinkConfig::Network(NetworkSinkConfig {
                endpoint: endpoint.clone(),
                hub_name: self.hub_name.clone().unwrap_or_default(),
                auth_token: self.token.clone(),
                ..Default::default()
            });
        } else if let Some(path) = &self.output_file {
            config.sink = SinkConfig::File { path: path.clone() };
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let catalog = config.catalog()?;
    let mut rng = match config.scheduler.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let players = build_population(&config.population, &catalog, &mut rng);

    let publisher = create_publisher(&config.sink)?;
    info!(sink = publisher.name(), "Publisher ready");

    let token = CancellationToken::new();
    if let Err(e) = telemetry::cancel_on_ctrl_c(token.clone()) {
        warn!(error = %e, "Ctrl-C handling unavailable");
    }

    let report = Scheduler::new(config.scheduler.clone()).run(
        players,
        Arc::new(Mutex::new(publisher)),
        token,
    )?;

    info!(
        generated = report.generated,
        sent = report.sent,
        shards = report.shard_sizes.len(),
        elapsed_secs = report.elapsed.as_secs_f64(),
        "Run finished"
    );
    Ok(())
}
