//! In-memory settings store
//!
//! Useful for embedding and tests. Keeps per-operation counters and can
//! simulate an outage for selected categories.

use crate::SettingsStore;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for monitoring and tests
#[derive(Debug, Default)]
pub struct StoreStats {
    pub loads: AtomicU64,
    pub exists_checks: AtomicU64,
    pub inserts: AtomicU64,
    pub updates: AtomicU64,
    pub row_deletes: AtomicU64,
    pub category_deletes: AtomicU64,
}

impl StoreStats {
    /// Number of calls that modify rows
    pub fn writes(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
            + self.updates.load(Ordering::Relaxed)
            + self.row_deletes.load(Ordering::Relaxed)
            + self.category_deletes.load(Ordering::Relaxed)
    }

    /// Number of calls of any kind
    pub fn total(&self) -> u64 {
        self.writes()
            + self.loads.load(Ordering::Relaxed)
            + self.exists_checks.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.loads.store(0, Ordering::Relaxed);
        self.exists_checks.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.updates.store(0, Ordering::Relaxed);
        self.row_deletes.store(0, Ordering::Relaxed);
        self.category_deletes.store(0, Ordering::Relaxed);
    }
}

/// Settings rows held in a `BTreeMap`
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    unavailable: RwLock<HashSet<String>>,
    stats: StoreStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Make every call touching `category` fail until cleared
    pub fn set_unavailable(&self, category: &str, unavailable: bool) {
        let mut set = self.unavailable.write();
        if unavailable {
            set.insert(category.to_string());
        } else {
            set.remove(category);
        }
    }

    /// Raw row lookup that bypasses the counters
    pub fn row(&self, category: &str, key: &str) -> Option<Vec<u8>> {
        self.rows
            .read()
            .get(&(category.to_string(), key.to_string()))
            .cloned()
    }

    /// Total number of rows
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn check_available(&self, category: &str) -> StoreResult<()> {
        if self.unavailable.read().contains(category) {
            return Err(StoreError::Unavailable(format!(
                "category '{category}' is offline"
            )));
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn load_category(&self, category: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        self.stats.loads.fetch_add(1, Ordering::Relaxed);
        self.check_available(category)?;
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|((row_category, _), _)| row_category == category)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect())
    }

    fn row_exists(&self, category: &str, key: &str) -> StoreResult<bool> {
        self.stats.exists_checks.fetch_add(1, Ordering::Relaxed);
        self.check_available(category)?;
        Ok(self
            .rows
            .read()
            .contains_key(&(category.to_string(), key.to_string())))
    }

    fn insert_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
        self.check_available(category)?;
        let mut rows = self.rows.write();
        let row_key = (category.to_string(), key.to_string());
        if rows.contains_key(&row_key) {
            return Err(StoreError::RowExists {
                category: category.to_string(),
                key: key.to_string(),
            });
        }
        rows.insert(row_key, value.to_vec());
        Ok(())
    }

    fn update_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        self.stats.updates.fetch_add(1, Ordering::Relaxed);
        self.check_available(category)?;
        let mut rows = self.rows.write();
        match rows.get_mut(&(category.to_string(), key.to_string())) {
            Some(existing) => {
                *existing = value.to_vec();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                category: category.to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn delete_rows(&self, category: &str, keys: &[String]) -> StoreResult<()> {
        self.stats.row_deletes.fetch_add(1, Ordering::Relaxed);
        self.check_available(category)?;
        let mut rows = self.rows.write();
        for key in keys {
            rows.remove(&(category.to_string(), key.clone()));
        }
        Ok(())
    }

    fn delete_category(&self, category: &str) -> StoreResult<()> {
        self.stats.category_deletes.fetch_add(1, Ordering::Relaxed);
        self.check_available(category)?;
        self.rows
            .write()
            .retain(|(row_category, _), _| row_category != category);
        Ok(())
    }
}
