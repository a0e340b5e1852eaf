//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: top-level [`Config`] and its sections (archive, bus, store, session)
//! - [`network`]: per-network connection settings ([`NetworkConfig`])
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup validation returning every problem at once

mod defaults;
mod network;
mod types;
mod validation;

pub use network::NetworkConfig;
pub use types::{
    ArchiveBackend, ArchiveConfig, BusConfig, Config, ConfigError, SessionConfig, StoreConfig,
};
pub use validation::{ValidationError, validate, validate_network};
