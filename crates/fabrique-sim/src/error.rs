//! Simulator error types

use std::path::PathBuf;

/// Problems with configuration files, profiles or population settings
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, reason: String },
    InvalidProfile { profile: String, reason: String },
    InvalidSetting { name: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "Cannot read config {}: {}", path.display(), source)
            }
            Self::Parse { path, reason } => {
                write!(f, "Cannot parse config {}: {}", path.display(), reason)
            }
            Self::InvalidProfile { profile, reason } => {
                write!(f, "Invalid profile {}: {}", profile, reason)
            }
            Self::InvalidSetting { name, reason } => write!(f, "Invalid setting {}: {}", name, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that prevent a simulation run from starting
#[derive(Debug)]
pub enum SchedulerError {
    NoWorkers,
    EmptyPopulation,
    Spawn(std::io::Error),
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoWorkers => write!(f, "Worker count must be at least 1"),
            Self::EmptyPopulation => write!(f, "No players defined for the simulation"),
            Self::Spawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            _ => None,
        }
    }
}
