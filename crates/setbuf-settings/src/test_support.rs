//! Shared fixtures for unit tests

use crate::backend::SettingsBackend;
use crate::registry::CacheRegistry;
use setbuf_cache::{MemoryCache, SettingsCache};
use setbuf_common::{BincodeCodec, CacheKeys, Codec, SettingsConfig, Value};
use setbuf_store::{MemoryStore, SettingsStore};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// In-memory store and cache wired to the default configuration.
///
/// Seeding helpers write through the adapters, then reset their counters so
/// tests only observe the calls made by the code under test.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub codec: Arc<dyn Codec>,
    pub keys: CacheKeys,
}

impl Harness {
    pub fn new() -> Self {
        let config = SettingsConfig::default();
        Self {
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryCache::new()),
            codec: Arc::new(BincodeCodec),
            keys: CacheKeys::new(config.cache_id),
        }
    }

    pub fn backend(&self) -> SettingsBackend {
        SettingsBackend::new(
            self.store.clone(),
            self.cache.clone(),
            SettingsConfig::default(),
        )
        .unwrap()
    }

    pub fn registry(&self) -> CacheRegistry {
        CacheRegistry::new(self.cache.clone(), self.codec.clone(), self.keys.registry())
    }

    pub fn seed_row(&self, category: &str, key: &str, value: Value) {
        let bytes = self.codec.encode(&value).unwrap();
        self.store.upsert_row(category, key, &bytes).unwrap();
        self.store.stats().reset();
    }

    /// Put a (possibly stale) cache entry for `category`
    pub fn seed_cache_entry(&self, category: &str) {
        let mut rows = BTreeMap::new();
        rows.insert("cached".to_string(), Value::Bool(true));
        self.seed_cache_rows(category, &rows);
    }

    pub fn seed_cache_rows(&self, category: &str, rows: &BTreeMap<String, Value>) {
        let bytes = self.codec.encode_map(rows).unwrap();
        self.cache
            .set(&self.keys.category(category), bytes, None)
            .unwrap();
        self.cache.stats().reset();
    }

    pub fn seed_registry(&self, categories: &[&str]) {
        let names: BTreeSet<String> = categories.iter().map(ToString::to_string).collect();
        let bytes = self.codec.encode_names(&names).unwrap();
        self.cache.set(&self.keys.registry(), bytes, None).unwrap();
        self.cache.stats().reset();
    }

    /// Decoded value of a persisted row
    pub fn stored_value(&self, category: &str, key: &str) -> Option<Value> {
        self.store
            .row(category, key)
            .map(|bytes| self.codec.decode(&bytes).unwrap())
    }

    /// Registry entry as currently held by the cache
    pub fn registry_entry(&self) -> Option<BTreeSet<String>> {
        self.cache
            .get(&self.keys.registry())
            .unwrap()
            .map(|bytes| self.codec.decode_names(&bytes).unwrap())
    }
}
