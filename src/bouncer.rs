//! Wires config, archive, bus, store and registry into one running core.

use anyhow::Context;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::archive::{
    ArchiveError, ArchivePage, ArchiveQuery, MemoryArchive, MessageArchive, SqliteArchive,
};
use crate::bus::EventBus;
use crate::config::{ArchiveBackend, ArchiveConfig, Config};
use crate::metrics;
use crate::registry::SessionRegistry;
use crate::session::{SessionServices, SessionSettings};
use crate::store::{ConfigStore, NetworkStore};
use crate::transport::TransportFactory;

pub struct Bouncer {
    registry: Arc<SessionRegistry>,
    archive: Arc<dyn MessageArchive>,
    bus: EventBus,
    shutdown: CancellationToken,
    maintenance: Option<JoinHandle<()>>,
}

impl Bouncer {
    /// Open storage, start every configured network and the archive
    /// maintenance task.
    pub async fn start(config: Config, factory: Arc<dyn TransportFactory>) -> anyhow::Result<Self> {
        metrics::init();

        let archive: Arc<dyn MessageArchive> = match config.archive.backend {
            ArchiveBackend::Memory => Arc::new(MemoryArchive::new(config.archive.capacity)),
            ArchiveBackend::Sqlite => Arc::new(
                SqliteArchive::open(&config.archive.path)
                    .await
                    .with_context(|| format!("opening archive at {}", config.archive.path))?,
            ),
        };

        let store: Option<Arc<dyn ConfigStore>> = match &config.store.path {
            Some(path) => Some(Arc::new(
                NetworkStore::open(path)
                    .with_context(|| format!("opening network store at {path}"))?,
            )),
            None => None,
        };

        let bus = EventBus::new(config.bus.capacity, config.bus.system_buffer);
        let services = SessionServices {
            bus: bus.clone(),
            archive: archive.clone(),
            factory,
            settings: SessionSettings::from_config(&config),
        };
        let registry = Arc::new(SessionRegistry::new(services, store));
        registry
            .load(&config.networks)
            .await
            .context("loading networks")?;

        let shutdown = CancellationToken::new();
        let maintenance = spawn_maintenance(&config.archive, archive.clone(), shutdown.clone());

        info!(
            backend = ?config.archive.backend,
            sessions = registry.len(),
            "Bouncer started"
        );
        Ok(Self {
            registry,
            archive,
            bus,
            shutdown,
            maintenance,
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn archive(&self) -> &Arc<dyn MessageArchive> {
        &self.archive
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn history(&self, query: &ArchiveQuery) -> Result<ArchivePage, ArchiveError> {
        self.archive.query(query).await
    }

    /// Stop maintenance and every session. Idempotent.
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.maintenance.take() {
            let _ = task.await;
        }
        self.registry.shutdown_all().await;
        info!("Bouncer stopped");
    }
}

/// Prune once now and then on every interval tick. `None` when retention is
/// disabled.
fn spawn_maintenance(
    config: &ArchiveConfig,
    archive: Arc<dyn MessageArchive>,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    let retention = config.retention()?;
    let mut interval = tokio::time::interval(config.prune_interval());

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match archive.prune(retention).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Pruned archive"),
                Err(e) => error!(error = %e, "Archive prune failed"),
            }
        }
    }))
}
