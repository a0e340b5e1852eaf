//! The set of live network sessions.
//!
//! [`SessionRegistry`] is the only owner of [`SessionHandle`]s. Mutations
//! (`put`, `delete`, `load`, `shutdown_all`) are serialized so two callers
//! replacing the same network cannot leave two sessions running.

use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::bus::{BusEvent, EventBus, SystemEvent, SystemKind};
use crate::config::{NetworkConfig, ValidationError, validate_network};
use crate::error::{CommandError, DispatchResult};
use crate::metrics;
use crate::session::{COMMANDS, Invocation, SessionHandle, SessionServices};
use crate::state::NetworkState;
use crate::store::{ConfigStore, StoreError};
use crate::telemetry::{CommandTimer, spans};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid network config: {}", join(.0))]
    Invalid(Vec<ValidationError>),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("session for {0} stopped unexpectedly")]
    SessionClosed(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What a newly attached observer needs to render without gaps.
pub struct Attachment {
    /// Live events from the moment of attaching.
    pub events: BoxStream<'static, BusEvent>,
    /// Every network's state, taken after `events` was subscribed.
    pub states: Vec<NetworkState>,
    /// Retained system events, oldest first.
    pub system: Vec<SystemEvent>,
}

pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
    services: SessionServices,
    store: Option<Arc<dyn ConfigStore>>,
    mutations: Mutex<()>,
}

impl SessionRegistry {
    pub fn new(services: SessionServices, store: Option<Arc<dyn ConfigStore>>) -> Self {
        Self {
            sessions: DashMap::new(),
            services,
            store,
            mutations: Mutex::new(()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.services.bus
    }

    pub fn get(&self, network: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(network).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn handles(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    /// Public state of every session, ordered by network name.
    pub async fn list(&self) -> Vec<NetworkState> {
        let states = join_all(self.handles().into_iter().map(|h| async move { h.state().await }));
        let mut states: Vec<_> = states.await.into_iter().flatten().collect();
        states.sort_by(|a, b| a.network.cmp(&b.network));
        states
    }

    pub async fn state(&self, network: &str) -> Option<NetworkState> {
        self.get(network)?.state().await
    }

    /// Create or replace the session for `config.network`.
    ///
    /// The config is persisted first; any existing session under that name is
    /// shut down before the new one starts, and the new one connects when
    /// `enabled` is set.
    pub async fn put(&self, config: NetworkConfig) -> Result<NetworkState, RegistryError> {
        let _guard = self.mutations.lock().await;
        self.put_locked(config).await
    }

    async fn put_locked(&self, config: NetworkConfig) -> Result<NetworkState, RegistryError> {
        validate_network(&config).map_err(RegistryError::Invalid)?;
        if let Some(store) = &self.store {
            store.put(&config)?;
        }

        let network = config.network.clone();
        if let Some((_, old)) = self.sessions.remove(&network) {
            debug!(network = %network, "Replacing session");
            old.shutdown().await;
        }

        let handle = Arc::new(SessionHandle::spawn(config.clone(), &self.services));
        self.sessions.insert(network.clone(), handle.clone());
        metrics::set_sessions(self.sessions.len());
        self.services
            .bus
            .system(Some(&network), SystemKind::SessionCreated);
        info!(network = %network, host = %config.host, enabled = config.enabled, "Session created");

        if config.enabled
            && let Err(e) = handle.connect().await
        {
            warn!(network = %network, error = %e, "Connect failed");
        }

        handle
            .state()
            .await
            .ok_or(RegistryError::SessionClosed(network))
    }

    /// Stop and forget a network. Fails when nothing by that name exists, or
    /// when the stored config cannot be removed (the session keeps running).
    pub async fn delete(&self, network: &str) -> DispatchResult {
        let _guard = self.mutations.lock().await;

        let stored = match &self.store {
            Some(store) => match store.delete(network) {
                Ok(existed) => existed,
                Err(e) => {
                    warn!(network = %network, error = %e, "Failed to delete stored config");
                    return DispatchResult::failed(e.to_string());
                }
            },
            None => false,
        };

        let Some((_, session)) = self.sessions.remove(network) else {
            return if stored {
                DispatchResult::ok()
            } else {
                CommandError::NetworkNotFound.into()
            };
        };

        session.shutdown().await;
        metrics::set_sessions(self.sessions.len());
        self.services
            .bus
            .system(Some(network), SystemKind::SessionRemoved);
        info!(network = %network, "Session removed");
        DispatchResult::ok()
    }

    /// Route one outbound command. Never fails loudly: every problem comes
    /// back as `{success: false, error}`.
    pub async fn dispatch(&self, network: &str, command: &str, args: &[String]) -> DispatchResult {
        let name = command.to_ascii_uppercase();
        let label = if COMMANDS.contains(&name.as_str()) {
            name.as_str()
        } else {
            "unknown"
        };
        let _timer = CommandTimer::new(label);

        let result = async {
            let session = self.get(network).ok_or(CommandError::NetworkNotFound)?;
            let invocation = Invocation::parse(command, args)?;
            session.dispatch(invocation).await
        }
        .instrument(spans::command(network, label))
        .await;

        match &result {
            Ok(()) => metrics::record_command(label, "ok"),
            Err(e) => {
                debug!(network = %network, command = %command, error = %e, "Command failed");
                metrics::record_command(label, e.error_code());
            }
        }
        result.into()
    }

    /// Subscribe, then snapshot. Anything that changes after the snapshot
    /// is already in the returned stream.
    pub async fn attach(&self, cancel: CancellationToken) -> Attachment {
        let events = self.services.bus.subscribe(cancel);
        let states = self.list().await;
        let system = self.services.bus.system_events();
        Attachment {
            events,
            states,
            system,
        }
    }

    /// Start a session for every stored config, then for each seed whose name
    /// the store does not know. Invalid entries are skipped. Returns the
    /// number of sessions started.
    pub async fn load(&self, seeds: &[NetworkConfig]) -> Result<usize, RegistryError> {
        let _guard = self.mutations.lock().await;

        let mut configs = match &self.store {
            Some(store) => store.load_all()?,
            None => Vec::new(),
        };
        for seed in seeds {
            if !configs.iter().any(|c| c.network == seed.network) {
                configs.push(seed.clone());
            }
        }

        let mut started = 0;
        for config in configs {
            let network = config.network.clone();
            match self.put_locked(config).await {
                Ok(_) => started += 1,
                Err(e) => warn!(network = %network, error = %e, "Skipping network"),
            }
        }
        info!(sessions = started, "Networks loaded");
        Ok(started)
    }

    /// Shut every session down concurrently. Idempotent.
    pub async fn shutdown_all(&self) {
        let _guard = self.mutations.lock().await;

        let names: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        let sessions: Vec<_> = names
            .iter()
            .filter_map(|name| self.sessions.remove(name).map(|(_, s)| s))
            .collect();
        if sessions.is_empty() {
            return;
        }

        info!(sessions = sessions.len(), "Shutting down sessions");
        join_all(sessions.iter().map(|s| s.shutdown())).await;
        metrics::set_sessions(self.sessions.len());
    }
}
