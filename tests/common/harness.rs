//! Registry wired to mock transports and an in-memory archive.

#![allow(dead_code)]

use slirc_bnc::archive::{ArchivePage, ArchiveQuery, MemoryArchive, MessageArchive};
use slirc_bnc::store::ConfigStore;
use slirc_bnc::{
    EventBus, NetworkConfig, RawEvent, SessionRegistry, SessionServices, SessionSettings,
    TransportEvent,
};
use std::sync::Arc;

use super::transport::MockFactory;

pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub archive: Arc<MemoryArchive>,
    pub factory: Arc<MockFactory>,
    pub bus: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_store(store: impl ConfigStore + 'static) -> Self {
        Self::build(Some(Arc::new(store)))
    }

    fn build(store: Option<Arc<dyn ConfigStore>>) -> Self {
        let archive = Arc::new(MemoryArchive::new(500));
        let factory = Arc::new(MockFactory::default());
        let bus = EventBus::default();
        let services = SessionServices {
            bus: bus.clone(),
            archive: archive.clone(),
            factory: factory.clone(),
            settings: SessionSettings::default(),
        };
        Self {
            registry: Arc::new(SessionRegistry::new(services, store)),
            archive,
            factory,
            bus,
        }
    }

    /// Register `network` with nick `me`, auto-joining `channels`.
    pub async fn add(&self, network: &str, channels: &[&str]) {
        let mut config = NetworkConfig::new(network, "127.0.0.1", "me");
        config.auto_join = channels.iter().map(|c| c.to_string()).collect();
        self.registry.put(config).await.expect("put network");
    }

    pub async fn send(&self, network: &str, event: TransportEvent) {
        self.factory
            .sink(network)
            .send(event)
            .await
            .expect("session inbox open");
    }

    pub async fn raw(&self, network: &str, event: RawEvent) {
        self.send(network, TransportEvent::Raw(event)).await;
    }

    /// Connecting, then registered as `me`.
    pub async fn connect(&self, network: &str) {
        self.send(network, TransportEvent::Connecting).await;
        self.send(
            network,
            TransportEvent::Registered {
                nick: "me".into(),
            },
        )
        .await;
    }

    /// Wait until everything sent so far has been processed and archived.
    pub async fn flush(&self, network: &str) {
        self.registry
            .get(network)
            .expect("session exists")
            .flush()
            .await;
    }

    pub async fn history(&self, network: &str, target: Option<&str>) -> ArchivePage {
        self.archive
            .query(&ArchiveQuery::new(network, target).limit(100))
            .await
            .expect("query archive")
    }
}

pub fn privmsg(source: &str, target: &str, text: &str) -> RawEvent {
    RawEvent::new("PRIVMSG", [target, text]).with_source(source)
}

pub fn args(a: &[&str]) -> Vec<String> {
    a.iter().map(|s| s.to_string()).collect()
}
