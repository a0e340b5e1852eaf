//! Core configuration types and loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use super::network::NetworkConfig;
use super::validation::{ValidationError, validate};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Bouncer configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Message history storage.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Live fan-out.
    #[serde(default)]
    pub bus: BusConfig,
    /// Network config persistence.
    #[serde(default)]
    pub store: StoreConfig,
    /// Per-session queue sizing.
    #[serde(default)]
    pub session: SessionConfig,
    /// Seed networks, used when the store has no entry for that name.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Archive backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    /// Bounded per-conversation rings, lost on restart.
    #[default]
    Memory,
    /// Durable SQLite store with keyset pagination.
    Sqlite,
}

/// Archive configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub backend: ArchiveBackend,
    /// SQLite file; `":memory:"` for a private in-memory database.
    #[serde(default = "default_archive_path")]
    pub path: String,
    /// Ring size per conversation (memory backend).
    #[serde(default = "default_archive_capacity")]
    pub capacity: usize,
    /// Per-network writer queue bound.
    #[serde(default = "default_archive_queue_depth")]
    pub queue_depth: usize,
    /// Messages older than this are pruned. 0 disables pruning.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backend: ArchiveBackend::default(),
            path: default_archive_path(),
            capacity: default_archive_capacity(),
            queue_depth: default_archive_queue_depth(),
            retention_days: default_retention_days(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl ArchiveConfig {
    /// Retention window, `None` when pruning is disabled.
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_days > 0)
            .then(|| Duration::from_secs(u64::from(self.retention_days) * 86_400))
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs.max(1))
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// Events a subscriber may fall behind before it is dropped.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
    /// System events retained for replay.
    #[serde(default = "default_system_buffer")]
    pub system_buffer: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
            system_buffer: default_system_buffer(),
        }
    }
}

/// Network config persistence.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// redb file. Absent means configs live only in memory.
    #[serde(default)]
    pub path: Option<String>,
}

/// Session actor tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Inbox bound shared by transport events and control messages.
    #[serde(default = "default_inbox_depth")]
    pub inbox_depth: usize,
    /// How long `shutdown` waits for the actor before giving up.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbox_depth: default_inbox_depth(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}
