//! Per-network connection settings.

use serde::{Deserialize, Serialize};

use super::defaults::{default_max_retries, default_port, default_true};

/// One IRC network the bouncer keeps a session for.
///
/// The transport consumes the connection fields; the session itself only
/// reads `network`, `nick`, `auto_join`, `quit_message` and `enabled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Unique key within the registry.
    pub network: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    /// Verify the server certificate when `tls` is set.
    #[serde(default = "default_true")]
    pub reject_unauthorized: bool,
    /// Server password. Never exposed through state views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub nick: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Real name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gecos: Option<String>,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    #[serde(default = "default_max_retries")]
    pub auto_reconnect_max_retries: u32,
    /// Channels joined after registration. An entry may carry a key
    /// separated by a space: `"#secret hunter2"`.
    #[serde(default)]
    pub auto_join: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quit_message: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl NetworkConfig {
    /// Minimal config with every optional field at its default.
    pub fn new(network: impl Into<String>, host: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            host: host.into(),
            port: default_port(),
            tls: false,
            reject_unauthorized: true,
            password: None,
            nick: nick.into(),
            username: None,
            gecos: None,
            auto_reconnect: true,
            auto_reconnect_max_retries: default_max_retries(),
            auto_join: Vec::new(),
            quit_message: None,
            enabled: true,
        }
    }

    /// Copy safe to hand to observers.
    pub fn public(&self) -> Self {
        Self {
            password: None,
            ..self.clone()
        }
    }

    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `auto_join` entries split into channel and optional key.
    pub fn auto_join_channels(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.auto_join.iter().filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let channel = parts.next()?;
            Some((channel, parts.next()))
        })
    }
}
