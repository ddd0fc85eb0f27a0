//! setbuf Store - backing store adapters
//!
//! The backing store is the source of truth for settings rows. Each row is
//! addressed by `(category, key)` and carries codec-encoded bytes; this
//! crate never interprets the bytes.

pub mod error;
pub mod memory;
pub mod redb_store;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreStats};
pub use redb_store::RedbStore;

/// Row-level access to persisted settings
pub trait SettingsStore: Send + Sync {
    /// All `(key, bytes)` rows of a category, in key order
    fn load_category(&self, category: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Whether a row exists for `category/key`
    fn row_exists(&self, category: &str, key: &str) -> StoreResult<bool>;

    /// Insert a row that does not exist yet
    fn insert_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Replace the value of an existing row
    fn update_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Update the row if present, insert it otherwise
    fn upsert_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        if self.row_exists(category, key)? {
            self.update_row(category, key, value)
        } else {
            self.insert_row(category, key, value)
        }
    }

    /// Delete the given keys of a category in one batch
    fn delete_rows(&self, category: &str, keys: &[String]) -> StoreResult<()>;

    /// Delete every row of a category
    fn delete_category(&self, category: &str) -> StoreResult<()>;
}
