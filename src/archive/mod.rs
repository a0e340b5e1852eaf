//! Message archive abstraction.
//!
//! Two interchangeable backends share one contract: [`MemoryArchive`] keeps a
//! bounded ring per conversation, [`SqliteArchive`] is durable. Both page
//! backwards with the message id as an exclusive cursor and file untargeted
//! messages under [`SERVER_TARGET`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::message::Message;
use crate::msgid;

pub mod memory;
pub mod ring;
pub mod sqlite;
pub mod writer;

pub use memory::MemoryArchive;
pub use ring::RingBuffer;
pub use sqlite::SqliteArchive;
pub use writer::ArchiveWriter;

/// Conversation key for messages without a target.
pub const SERVER_TARGET: &str = "*";

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

/// Oldest timestamp still inside `retention`.
pub fn retention_cutoff(retention: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(retention)
        .ok()
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Lookup key for a conversation.
pub fn archive_key(target: Option<&str>) -> String {
    match target {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => SERVER_TARGET.to_owned(),
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// One page request. `target: None` reads the server conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveQuery {
    pub network: String,
    #[serde(default)]
    pub target: Option<String>,
    /// Exclusive upper bound: only messages strictly older than this id.
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ArchiveQuery {
    pub fn new(network: impl Into<String>, target: Option<&str>) -> Self {
        Self {
            network: network.into(),
            target: target.map(str::to_owned),
            before: None,
            limit: None,
        }
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requested limit clamped to `1..=MAX_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn key(&self) -> String {
        archive_key(self.target.as_deref())
    }

    /// Reject cursors that are not message ids.
    pub fn validate(&self) -> Result<(), ArchiveError> {
        match &self.before {
            Some(cursor) if !msgid::is_valid(cursor) => {
                Err(ArchiveError::InvalidCursor(cursor.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Messages oldest first, plus the cursor for the next older page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<String>,
}

impl ArchivePage {
    /// Build a page from rows fetched newest first, at most `limit + 1` of them.
    pub fn from_newest_first(mut rows: Vec<Message>, limit: usize) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        rows.reverse();
        let oldest_id = rows.first().map(|m| m.id.clone());
        Self {
            messages: rows,
            has_more,
            oldest_id,
        }
    }
}

#[async_trait]
pub trait MessageArchive: Send + Sync {
    /// Append one message. Storing an id twice keeps the first copy.
    async fn store(&self, message: &Message) -> Result<(), ArchiveError>;

    /// One page of a conversation, oldest first.
    async fn query(&self, query: &ArchiveQuery) -> Result<ArchivePage, ArchiveError>;

    /// Fetch a single message by id.
    async fn get(&self, id: &str) -> Result<Option<Message>, ArchiveError>;

    /// Delete a network's whole history. Returns messages removed.
    async fn purge_network(&self, network: &str) -> Result<usize, ArchiveError>;

    /// Delete messages older than `retention`. Returns messages removed.
    async fn prune(&self, retention: Duration) -> Result<usize, ArchiveError>;
}
