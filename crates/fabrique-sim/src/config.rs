//! Simulation configuration
//!
//! Everything a run needs, loadable from a JSON file. Missing sections fall
//! back to defaults, so `{}` is a valid configuration.
//!
//! ```json
//! {
//!   "population": { "normal": 10, "fraudster": 2 },
//!   "scheduler": { "workers": 4, "duration_secs": 60, "seed": 7 },
//!   "sink": { "kind": "file", "path": "out/casino_events.json" },
//!   "profiles": []
//! }
//! ```

use crate::error::ConfigError;
use crate::population::PopulationConfig;
use crate::profile::{BehaviorProfile, ProfileCatalog};
use crate::scheduler::SchedulerConfig;
use fabrique_core::SinkConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population: PopulationConfig,
    pub scheduler: SchedulerConfig,
    pub sink: SinkConfig,
    /// Replacements for built-in category profiles
    pub profiles: Vec<BehaviorProfile>,
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.workers == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "scheduler.workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.population.total() == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "population",
                reason: "no players configured".to_string(),
            });
        }
        if self.scheduler.batch_threshold == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "scheduler.batch_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        for profile in &self.profiles {
            profile.validate()?;
        }
        Ok(())
    }

    /// Built-in profiles with this config's overrides applied
    pub fn catalog(&self) -> Result<ProfileCatalog, ConfigError> {
        ProfileCatalog::with_overrides(&self.profiles)
    }
}
