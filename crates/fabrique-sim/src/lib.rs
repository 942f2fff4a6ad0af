//! Fabrique Sim - Casino Player Simulation
//!
//! Generates synthetic casino activity: players with category profiles play
//! sessions of deposits, bets, bonus claims and withdrawals, and a scheduler
//! runs the whole population on worker threads, draining events through a
//! [`fabrique_core::Publisher`].
//!
//! ## Example
//!
//! ```no_run
//! use fabrique_core::FileSink;
//! use fabrique_sim::{PopulationConfig, ProfileCatalog, Scheduler, SchedulerConfig, build_population};
//! use rand::SeedableRng;
//! use std::sync::{Arc, Mutex};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let players = build_population(&PopulationConfig::default(), &ProfileCatalog::defaults(), &mut rng);
//! let sink = FileSink::new("casino_events.json").unwrap();
//!
//! let config = SchedulerConfig { workers: 4, duration_secs: 10, ..Default::default() };
//! let report = Scheduler::new(config)
//!     .run(players, Arc::new(Mutex::new(sink)), CancellationToken::new())
//!     .unwrap();
//! println!("{} events generated", report.generated);
//! ```

pub mod bonus;
pub mod config;
pub mod error;
pub mod game;
pub mod player;
pub mod population;
pub mod profile;
pub mod scheduler;
pub mod session;

pub use bonus::{Bonus, BonusType};
pub use config::SimulationConfig;
pub use error::{ConfigError, SchedulerError};
pub use game::Game;
pub use player::{Player, PlayerStats};
pub use population::{PopulationConfig, build_population};
pub use profile::{BehaviorProfile, ProfileCatalog, ProfileType};
pub use scheduler::{Scheduler, SchedulerConfig, SimulationReport, SimulationTotals, partition_shards};
pub use session::simulate_session;
