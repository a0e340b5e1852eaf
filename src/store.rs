//! Redb-backed persistence for network configs.
//!
//! # Schema
//!
//! ```text
//! NETWORKS: network name -> NetworkConfig (serde_json)
//! ```

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NetworkConfig;

const NETWORKS: TableDefinition<&str, &[u8]> = TableDefinition::new("networks");

/// Errors from network-config persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where the registry keeps network configs between restarts.
pub trait ConfigStore: Send + Sync {
    /// Insert or replace a network's config.
    fn put(&self, config: &NetworkConfig) -> Result<(), StoreError>;

    /// Remove a network's config. Returns whether it existed.
    fn delete(&self, network: &str) -> Result<bool, StoreError>;

    /// Every stored config.
    fn load_all(&self) -> Result<Vec<NetworkConfig>, StoreError>;
}

#[derive(Clone)]
pub struct NetworkStore {
    db: Arc<Database>,
}

impl NetworkStore {
    /// Open or create the store file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::create(path)?;

        // Ensure the table exists so reads on a fresh file succeed.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(NETWORKS)?;
        }
        write_txn.commit()?;

        info!(path = %path.display(), "Network store opened");
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, network: &str) -> Result<Option<NetworkConfig>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NETWORKS)?;
        match table.get(network)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

impl ConfigStore for NetworkStore {
    fn put(&self, config: &NetworkConfig) -> Result<(), StoreError> {
        let value = serde_json::to_vec(config)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(NETWORKS)?;
            table.insert(config.network.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;
        debug!(network = %config.network, "Saved network config");
        Ok(())
    }

    fn delete(&self, network: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(NETWORKS)?;
            table.remove(network)?.is_some()
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Undecodable entries are skipped with a warning.
    fn load_all(&self) -> Result<Vec<NetworkConfig>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NETWORKS)?;

        let mut configs = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            match serde_json::from_slice::<NetworkConfig>(value.value()) {
                Ok(config) => configs.push(config),
                Err(e) => {
                    warn!(network = %key.value(), error = %e, "Failed to deserialize network config, skipping");
                }
            }
        }
        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = NetworkStore::open(dir.path().join("networks.redb")).unwrap();

        let mut cfg = NetworkConfig::new("libera", "irc.libera.chat", "me");
        cfg.password = Some("secret".into());
        store.put(&cfg).unwrap();
        assert_eq!(store.get("libera").unwrap(), Some(cfg.clone()));

        cfg.nick = "me2".into();
        store.put(&cfg).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![cfg]);

        assert!(store.delete("libera").unwrap());
        assert!(!store.delete("libera").unwrap());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("networks.redb");
        {
            let store = NetworkStore::open(&path).unwrap();
            store.put(&NetworkConfig::new("a", "h", "n")).unwrap();
            store.put(&NetworkConfig::new("b", "h", "n")).unwrap();
        }
        let store = NetworkStore::open(&path).unwrap();
        let names: Vec<_> = store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|c| c.network)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
