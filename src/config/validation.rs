//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{ArchiveBackend, Config, NetworkConfig};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("archive.capacity must be at least 1")]
    ZeroArchiveCapacity,
    #[error("archive.queue_depth must be at least 1")]
    ZeroQueueDepth,
    #[error("archive.path parent directory does not exist: {0}")]
    ArchivePathInvalid(String),
    #[error("bus.capacity must be at least 1")]
    ZeroBusCapacity,
    #[error("session.inbox_depth must be at least 1")]
    ZeroInboxDepth,
    #[error("network name is required")]
    MissingNetworkName,
    #[error("network name must not contain whitespace: '{0}'")]
    InvalidNetworkName(String),
    #[error("network '{0}' is defined more than once")]
    DuplicateNetwork(String),
    #[error("network '{0}': host is required")]
    MissingHost(String),
    #[error("network '{0}': nick is required")]
    MissingNick(String),
    #[error("network '{0}': nick must not contain spaces")]
    InvalidNick(String),
    #[error("network '{0}': port must not be 0")]
    InvalidPort(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.archive.capacity == 0 {
        errors.push(ValidationError::ZeroArchiveCapacity);
    }
    if config.archive.queue_depth == 0 {
        errors.push(ValidationError::ZeroQueueDepth);
    }
    if config.archive.backend == ArchiveBackend::Sqlite && config.archive.path != ":memory:" {
        let db_path = Path::new(&config.archive.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::ArchivePathInvalid(
                config.archive.path.clone(),
            ));
        }
    }
    if config.bus.capacity == 0 {
        errors.push(ValidationError::ZeroBusCapacity);
    }
    if config.session.inbox_depth == 0 {
        errors.push(ValidationError::ZeroInboxDepth);
    }

    let mut seen = HashSet::new();
    for network in &config.networks {
        if let Err(mut network_errors) = validate_network(network) {
            errors.append(&mut network_errors);
        }
        if !network.network.is_empty() && !seen.insert(network.network.as_str()) {
            errors.push(ValidationError::DuplicateNetwork(network.network.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one network definition.
pub fn validate_network(network: &NetworkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let name = &network.network;

    if name.is_empty() {
        errors.push(ValidationError::MissingNetworkName);
    } else if name.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidNetworkName(name.clone()));
    }
    if network.host.is_empty() {
        errors.push(ValidationError::MissingHost(name.clone()));
    }
    if network.nick.is_empty() {
        errors.push(ValidationError::MissingNick(name.clone()));
    } else if network.nick.contains(' ') {
        errors.push(ValidationError::InvalidNick(name.clone()));
    }
    if network.port == 0 {
        errors.push(ValidationError::InvalidPort(name.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
