//! File-backed TTL cache using redb
//!
//! Lets separate processes (e.g. successive CLI invocations) share cached
//! categories and the cache registry. Each entry is stored with its
//! absolute expiry time; expired entries read as misses and are removed by
//! `purge_expired`.

use crate::SettingsCache;
use crate::error::CacheResult;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Cache entries: key (str) → bincode(StoredEntry)
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("cache_entries");

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    /// Unix time in milliseconds after which the entry is dead
    expires_at_ms: Option<u64>,
    payload: Vec<u8>,
}

impl StoredEntry {
    fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|deadline| now_ms >= deadline)
    }
}

/// Persistent cache backed by redb.
pub struct RedbCache {
    db: Database,
}

impl RedbCache {
    /// Open (or create) the cache file at `path`.
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(ENTRIES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Remove every expired entry; returns how many were dropped
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let now = now_ms();
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(ENTRIES)?;
            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let dead = bincode::deserialize::<StoredEntry>(value.value())
                    .map_or(true, |stored| stored.is_expired(now));
                if dead {
                    expired.push(key.value().to_string());
                }
            }
            for key in &expired {
                table.remove(key.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        debug!("Purged {} expired cache entries", purged);
        Ok(purged)
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> CacheResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl SettingsCache for RedbCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        let Some(value) = table.get(key)? else {
            return Ok(None);
        };
        let stored: StoredEntry = bincode::deserialize(value.value())?;
        if stored.is_expired(now_ms()) {
            debug!("Cache entry '{}' expired", key);
            return Ok(None);
        }
        Ok(Some(stored.payload))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let stored = StoredEntry {
            expires_at_ms: ttl.map(|ttl| {
                now_ms().saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
            }),
            payload: value,
        };
        let bytes = bincode::serialize(&stored)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.insert(key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
