//! Bounded in-memory archive.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Duration;

use super::{
    ArchiveError, ArchivePage, ArchiveQuery, MessageArchive, RingBuffer, archive_key,
    retention_cutoff,
};
use crate::message::Message;

pub const DEFAULT_CAPACITY: usize = 500;

/// One ring per (network, lowercased target). Each ring has its own lock,
/// so conversations never contend with each other.
pub struct MemoryArchive {
    capacity: usize,
    buckets: DashMap<(String, String), Mutex<RingBuffer<Message>>>,
}

impl MemoryArchive {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buckets: DashMap::new(),
        }
    }

    /// Number of conversations held.
    pub fn conversation_count(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for MemoryArchive {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl MessageArchive for MemoryArchive {
    async fn store(&self, message: &Message) -> Result<(), ArchiveError> {
        let key = (message.network.clone(), archive_key(message.target.as_deref()));
        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| Mutex::new(RingBuffer::new(self.capacity)));
        let mut ring = bucket.lock();
        // Ids only grow, so anything not newer than the newest entry is a replay.
        if ring.iter().next_back().is_some_and(|newest| newest.id >= message.id) {
            return Ok(());
        }
        ring.push(message.clone());
        Ok(())
    }

    async fn query(&self, query: &ArchiveQuery) -> Result<ArchivePage, ArchiveError> {
        query.validate()?;
        let limit = query.effective_limit();
        let Some(bucket) = self.buckets.get(&(query.network.clone(), query.key())) else {
            return Ok(ArchivePage::default());
        };
        let ring = bucket.lock();
        let before = query.before.as_deref();
        let rows: Vec<Message> = ring
            .iter()
            .rev()
            .filter(|m| before.is_none_or(|b| m.id.as_str() < b))
            .take(limit + 1)
            .cloned()
            .collect();
        Ok(ArchivePage::from_newest_first(rows, limit))
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, ArchiveError> {
        for bucket in self.buckets.iter() {
            if let Some(found) = bucket.lock().iter().find(|m| m.id == id) {
                return Ok(Some(found.clone()));
            }
        }
        Ok(None)
    }

    async fn purge_network(&self, network: &str) -> Result<usize, ArchiveError> {
        let mut removed = 0;
        self.buckets.retain(|(net, _), ring| {
            if net == network {
                removed += ring.get_mut().len();
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn prune(&self, retention: Duration) -> Result<usize, ArchiveError> {
        let cutoff = retention_cutoff(retention);
        let mut removed = 0;
        for bucket in self.buckets.iter() {
            removed += bucket.lock().retain(|m| m.timestamp >= cutoff);
        }
        self.buckets.retain(|_, ring| !ring.get_mut().is_empty());
        Ok(removed)
    }
}
