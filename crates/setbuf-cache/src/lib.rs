//! setbuf Cache - cache adapters
//!
//! The cache holds encoded category snapshots and the cache registry. It is
//! never the source of truth: callers treat every failure as a miss.

pub mod error;
pub mod memory;
pub mod redb_cache;

pub use error::{CacheError, CacheResult};
pub use memory::{CacheStats, MemoryCache};
pub use redb_cache::RedbCache;

use std::time::Duration;

/// String-keyed byte cache with optional expiry
pub trait SettingsCache: Send + Sync {
    /// Look up an entry. Expired entries are misses.
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store an entry. `None` means it never expires.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Remove an entry. Removing a missing entry is not an error.
    fn delete(&self, key: &str) -> CacheResult<()>;
}
