//! Durable SQLite archive with keyset pagination.
//!
//! Rows are keyed by message id. Ids are UUIDv7 strings whose lexicographic
//! order is generation order, so `id < ?` is the page boundary and stays
//! correct while other sessions keep inserting.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

use super::{
    ArchiveError, ArchivePage, ArchiveQuery, MessageArchive, archive_key, retention_cutoff,
};
use crate::message::{Message, MessageMeta};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// (id, timestamp, network, target, source, command, content, self, meta)
type MessageRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    bool,
    String,
);

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, network, target, source, command, content, self, meta FROM messages";

#[derive(Clone)]
pub struct SqliteArchive {
    pool: SqlitePool,
}

impl SqliteArchive {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the archive at `path`, running migrations.
    /// `":memory:"` gives a private in-memory database.
    pub async fn open(path: &str) -> Result<Self, ArchiveError> {
        let pool = if path == ":memory:" {
            // Unique name per call so parallel tests never share rows. The
            // database lives as long as its single connection.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:slirc-bnc-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create archive directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Archive database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;

        // WAL lets queries read while a session writer commits.
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Total archived messages.
    pub async fn count(&self) -> Result<i64, ArchiveError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row_to_message(row: MessageRow) -> Result<Message, ArchiveError> {
    let (id, timestamp, network, target, source, command, content, is_self, meta) = row;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| ArchiveError::Corrupt {
            id: id.clone(),
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);
    let meta: MessageMeta = serde_json::from_str(&meta)?;
    Ok(Message {
        id,
        timestamp,
        network,
        command,
        target,
        source,
        content,
        is_self,
        meta,
    })
}

#[async_trait]
impl MessageArchive for SqliteArchive {
    async fn store(&self, message: &Message) -> Result<(), ArchiveError> {
        let meta = serde_json::to_string(&message.meta)?;
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages
                (id, timestamp, network, target, target_key, source, command, content, self, meta)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(format_timestamp(&message.timestamp))
        .bind(&message.network)
        .bind(&message.target)
        .bind(archive_key(message.target.as_deref()))
        .bind(&message.source)
        .bind(&message.command)
        .bind(&message.content)
        .bind(message.is_self)
        .bind(meta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, query: &ArchiveQuery) -> Result<ArchivePage, ArchiveError> {
        query.validate()?;
        let limit = query.effective_limit();
        let fetch = i64::try_from(limit + 1).unwrap_or(i64::MAX);

        let rows: Vec<MessageRow> = match &query.before {
            Some(before) => {
                sqlx::query_as(&format!(
                    "{SELECT_COLUMNS} WHERE network = ? AND target_key = ? AND id < ? ORDER BY id DESC LIMIT ?"
                ))
                .bind(&query.network)
                .bind(query.key())
                .bind(before)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "{SELECT_COLUMNS} WHERE network = ? AND target_key = ? ORDER BY id DESC LIMIT ?"
                ))
                .bind(&query.network)
                .bind(query.key())
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let messages = rows
            .into_iter()
            .map(row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArchivePage::from_newest_first(messages, limit))
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, ArchiveError> {
        let row: Option<MessageRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_message).transpose()
    }

    async fn purge_network(&self, network: &str) -> Result<usize, ArchiveError> {
        let result = sqlx::query("DELETE FROM messages WHERE network = ?")
            .bind(network)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn prune(&self, retention: Duration) -> Result<usize, ArchiveError> {
        let cutoff = format_timestamp(&retention_cutoff(retention));
        let result = sqlx::query("DELETE FROM messages WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}
