//! In-process TTL cache
//!
//! Entries live in a `HashMap` behind a `RwLock` and expire lazily on read.
//! Suitable when all units of work share one process.

use crate::SettingsCache;
use crate::error::{CacheError, CacheResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Individual cache entry with optional deadline
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: AtomicU64,
    /// Number of cache misses (including expired entries)
    pub misses: AtomicU64,
    /// Number of `set` calls
    pub writes: AtomicU64,
    /// Number of `delete` calls
    pub deletes: AtomicU64,
    /// Number of entries dropped because their TTL elapsed
    pub expirations: AtomicU64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    /// Calls that change cache contents
    pub fn mutations(&self) -> u64 {
        self.writes.load(Ordering::Relaxed) + self.deletes.load(Ordering::Relaxed)
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}

/// TTL cache held in process memory
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: CacheStats,
    offline: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Simulate an unreachable backend: every call fails while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Check if a live (unexpired) entry exists, without touching stats
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Get the current number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn check_online(&self) -> CacheResult<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(CacheError::Unavailable("memory cache is offline".into()));
        }
        Ok(())
    }
}

impl SettingsCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check_online()?;
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.data.clone()));
                }
                Some(_) => {}
                None => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: drop it under the write lock unless it was replaced meanwhile
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            self.stats.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        self.check_online()?;
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry {
            data: value,
            // A deadline past what `Instant` can represent never expires
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.check_online()?;
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        self.entries.write().remove(key);
        Ok(())
    }
}
