//! Settings session
//!
//! One `Settings` value per unit of work. Reads load whole categories on
//! first access (cache first, then the store). Writes are visible at once
//! and persisted only by `flush()`; dropping a session without flushing
//! discards its writes.

use crate::backend::SettingsBackend;
use crate::buffer::WriteBuffer;
use crate::error::{SettingsError, SettingsResult};
use crate::flush::{FlushCoordinator, FlushReport};
use crate::index::SettingsIndex;
use crate::registry::CacheRegistry;
use setbuf_common::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// A key to read, with the value returned when it is missing
#[derive(Debug, Clone, PartialEq)]
pub struct KeyQuery {
    pub key: String,
    pub default: Value,
}

impl KeyQuery {
    pub fn new(key: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            default: default.into(),
        }
    }
}

impl From<&str> for KeyQuery {
    fn from(key: &str) -> Self {
        Self::new(key, Value::Null)
    }
}

impl From<String> for KeyQuery {
    fn from(key: String) -> Self {
        Self::new(key, Value::Null)
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for KeyQuery {
    fn from((key, default): (K, V)) -> Self {
        Self::new(key, default)
    }
}

/// Category-scoped settings with deferred write-back
pub struct Settings {
    backend: SettingsBackend,
    index: SettingsIndex,
    buffer: WriteBuffer,
    registry: CacheRegistry,
}

impl Settings {
    pub(crate) fn new(backend: SettingsBackend) -> Self {
        let registry = backend.registry();
        Self {
            backend,
            index: SettingsIndex::new(),
            buffer: WriteBuffer::new(),
            registry,
        }
    }

    pub fn backend(&self) -> &SettingsBackend {
        &self.backend
    }

    /// Set `category/key` and stage it for persistence
    pub fn set(&mut self, category: &str, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.buffer.stage_save(category, key, value.clone());
        self.index.set(category, key, value);
    }

    /// Set several keys of one category
    pub fn set_many<I, K, V>(&mut self, category: &str, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in pairs {
            self.set(category, key.as_ref(), value);
        }
    }

    /// Set `category/key` for this session only; never persisted
    pub fn set_local(&mut self, category: &str, key: &str, value: impl Into<Value>) {
        self.index.set(category, key, value.into());
    }

    pub fn set_many_local<I, K, V>(&mut self, category: &str, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in pairs {
            self.set_local(category, key.as_ref(), value);
        }
    }

    /// Value of `category/key`, or `default` when it is not set
    pub fn get(
        &mut self,
        category: &str,
        key: &str,
        default: impl Into<Value>,
    ) -> SettingsResult<Value> {
        self.ensure_loaded(category)?;
        Ok(self
            .index
            .get(category, key)
            .cloned()
            .unwrap_or_else(|| default.into()))
    }

    /// Every key of `category`, `None` when the category holds nothing
    pub fn get_category(
        &mut self,
        category: &str,
    ) -> SettingsResult<Option<&BTreeMap<String, Value>>> {
        self.ensure_loaded(category)?;
        Ok(self.index.category(category))
    }

    /// Read several keys of one category at once.
    ///
    /// Plain keys default to `Value::Null`; use `(key, default)` pairs to
    /// supply per-key defaults.
    pub fn get_many<I, Q>(
        &mut self,
        category: &str,
        queries: I,
    ) -> SettingsResult<BTreeMap<String, Value>>
    where
        I: IntoIterator<Item = Q>,
        Q: Into<KeyQuery>,
    {
        self.ensure_loaded(category)?;
        Ok(queries
            .into_iter()
            .map(|query| {
                let KeyQuery { key, default } = query.into();
                let value = self.index.get(category, &key).cloned().unwrap_or(default);
                (key, value)
            })
            .collect())
    }

    /// Delete `category/key`. Returns whether a delete was staged.
    ///
    /// In a loaded category only existing keys are staged. In a category not
    /// loaded yet, existence is unknown without a load, so the delete is
    /// staged regardless: the flush sends it to the store even when no such
    /// row exists, and the key is hidden from rows loaded later. Call
    /// `ensure_loaded` first to delete only keys that exist.
    pub fn delete(&mut self, category: &str, key: &str) -> bool {
        if category.is_empty() {
            return false;
        }
        let existed = self.index.remove(category, key).is_some();
        if !existed && self.index.is_loaded(category) {
            return false;
        }
        self.buffer.stage_delete(category, key);
        true
    }

    /// Delete several keys; returns how many deletes were staged
    pub fn delete_keys<I, K>(&mut self, category: &str, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .filter(|key| self.delete(category, key.as_ref()))
            .count()
    }

    /// Delete every key of `category` and drop its cache entry at flush
    pub fn delete_category(&mut self, category: &str) {
        if category.is_empty() {
            return;
        }
        self.index.remove_category(category);
        self.buffer.stage_category_delete(category);
        self.invalidate_cache(category);
        debug!("Staged delete of category '{}'", category);
    }

    /// Drop the cache entry of `category` at the next flush
    pub fn invalidate_cache(&mut self, category: &str) {
        self.registry.remove(category);
    }

    /// Drop the cache entry of every registered category at the next flush
    pub fn invalidate_all_cache(&mut self) {
        self.registry.remove_all();
    }

    /// Categories currently registered as cached
    pub fn cached_categories(&mut self) -> &BTreeSet<String> {
        self.registry.load()
    }

    pub fn is_loaded(&self, category: &str) -> bool {
        self.index.is_loaded(category)
    }

    /// The live map of every category touched in this session
    pub fn snapshot(&self) -> &HashMap<String, BTreeMap<String, Value>> {
        self.index.items()
    }

    /// Whether `flush()` has writes to apply
    pub fn has_pending_writes(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Load `category` unless this session already did.
    ///
    /// A store failure leaves the category unloaded so a later call retries.
    pub fn ensure_loaded(&mut self, category: &str) -> SettingsResult<()> {
        if self.index.is_loaded(category) {
            return Ok(());
        }
        let fetched = self.fetch_category(category)?;
        self.index
            .merge_loaded(category, fetched, self.buffer.pending_deletes(category));
        Ok(())
    }

    /// Apply staged writes to the store and reconcile the cache
    pub fn flush(&mut self) -> FlushReport {
        let coordinator = FlushCoordinator::new(
            self.backend.store(),
            self.backend.cache(),
            self.backend.codec(),
            self.backend.keys(),
            self.backend.cache_ttl(),
        );
        coordinator.run(self.buffer.take(), &mut self.registry)
    }

    fn fetch_category(&mut self, category: &str) -> SettingsResult<BTreeMap<String, Value>> {
        let cache_key = self.backend.keys().category(category);
        match self.backend.cache().get(&cache_key) {
            Ok(Some(bytes)) => match self.backend.codec().decode_map(&bytes) {
                Ok(values) => {
                    debug!("Cache hit for category '{}'", category);
                    self.registry.add(category);
                    return Ok(values);
                }
                Err(e) => warn!("Ignoring undecodable cache entry '{}': {}", cache_key, e),
            },
            Ok(None) => debug!("Cache miss for category '{}'", category),
            Err(e) => warn!("Failed to read cache entry '{}': {}", cache_key, e),
        }

        let rows = self
            .backend
            .store()
            .load_category(category)
            .map_err(|e| SettingsError::store(category, e))?;

        let codec = self.backend.codec();
        let mut values = BTreeMap::new();
        for (key, bytes) in rows {
            match codec.decode(&bytes) {
                Ok(value) => {
                    values.insert(key, value);
                }
                Err(e) => warn!("Skipping undecodable row {}/{}: {}", category, key, e),
            }
        }
        debug!("Loaded {} rows for category '{}' from store", values.len(), category);

        if !values.is_empty() {
            self.populate_cache(category, &cache_key, &values);
        }
        Ok(values)
    }

    fn populate_cache(
        &mut self,
        category: &str,
        cache_key: &str,
        values: &BTreeMap<String, Value>,
    ) {
        let written = self
            .backend
            .codec()
            .encode_map(values)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                self.backend
                    .cache()
                    .set(cache_key, bytes, self.backend.cache_ttl())
                    .map_err(|e| e.to_string())
            });
        match written {
            Ok(()) => self.registry.add(category),
            Err(e) => warn!("Failed to cache category '{}': {}", category, e),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("backend", &self.backend)
            .field("index", &self.index)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
