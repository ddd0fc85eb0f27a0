//! Flush coordinator: drains a session's pending writes into the backing
//! store, then reconciles the cache and the cache registry.
//!
//! Order is fixed: category deletes, per-key deletes, saves, registry
//! write-back, cache invalidation. Each category's batch is independent; a
//! store failure aborts only that category, which is still invalidated.

use crate::buffer::PendingWrites;
use crate::error::{SettingsError, SettingsResult};
use crate::registry::{CacheRegistry, RegistryChange};
use setbuf_cache::SettingsCache;
use setbuf_common::{CacheKeys, Codec, Value};
use setbuf_store::SettingsStore;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happened to the registry entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryAction {
    #[default]
    None,
    /// Entry rewritten with this many categories
    Rewritten(usize),
    /// Entry deleted
    Dropped,
}

/// A category whose batch did not complete
#[derive(Debug)]
pub struct CategoryFailure {
    pub category: String,
    pub error: SettingsError,
}

/// Outcome of one flush
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Categories whose rows were fully deleted
    pub categories_deleted: usize,
    /// Keys removed through per-key delete batches
    pub rows_deleted: usize,
    /// Rows inserted or updated
    pub rows_saved: usize,
    /// Categories whose cache entries were invalidated
    pub invalidated: BTreeSet<String>,
    pub registry: RegistryAction,
    /// Per-category store or serialization failures
    pub failures: Vec<CategoryFailure>,
    /// Cache calls that failed (logged, never fatal)
    pub cache_errors: usize,
}

impl FlushReport {
    /// Nothing was written anywhere
    pub fn is_noop(&self) -> bool {
        self.categories_deleted == 0
            && self.rows_deleted == 0
            && self.rows_saved == 0
            && self.invalidated.is_empty()
            && self.registry == RegistryAction::None
            && self.failures.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_categories(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.category.as_str()).collect()
    }

    /// Turn store failures into an error, keeping the report otherwise
    pub fn into_result(self) -> SettingsResult<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(SettingsError::FlushFailed {
                categories: self.failures.into_iter().map(|f| f.category).collect(),
            })
        }
    }

    fn has_failed(&self, category: &str) -> bool {
        self.failures.iter().any(|f| f.category == category)
    }

    fn fail(&mut self, category: &str, error: SettingsError) {
        error!("Flush of category '{}' failed: {}", category, error);
        self.failures.push(CategoryFailure {
            category: category.to_string(),
            error,
        });
    }
}

/// Applies pending writes against a store and cache
pub struct FlushCoordinator<'a> {
    store: &'a dyn SettingsStore,
    cache: &'a dyn SettingsCache,
    codec: &'a dyn Codec,
    keys: &'a CacheKeys,
    ttl: Option<Duration>,
}

impl<'a> FlushCoordinator<'a> {
    pub fn new(
        store: &'a dyn SettingsStore,
        cache: &'a dyn SettingsCache,
        codec: &'a dyn Codec,
        keys: &'a CacheKeys,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            cache,
            codec,
            keys,
            ttl,
        }
    }

    /// Drain `pending` into the store and reconcile the cache.
    ///
    /// With nothing pending and an unchanged registry this makes no store or
    /// cache calls at all.
    pub fn run(&self, pending: PendingWrites, registry: &mut CacheRegistry) -> FlushReport {
        let mut report = FlushReport::default();
        if pending.is_empty() && !registry.has_changes() {
            debug!("Nothing to flush");
            return report;
        }

        let PendingWrites {
            category_deletes,
            deletes,
            mut saves,
        } = pending;
        let mut invalidate = BTreeSet::new();

        // 1. Whole-category deletes
        for category in &category_deletes {
            match self.store.delete_category(category) {
                Ok(()) => report.categories_deleted += 1,
                Err(e) => report.fail(category, SettingsError::store(category, e)),
            }
            invalidate.insert(category.clone());
        }

        // 2. Per-key deletes, one batch per category; a delete beats a stale save
        for (category, keys) in deletes {
            if let Some(staged) = saves.get_mut(&category) {
                staged.retain(|key, _| !keys.contains(key));
            }
            if !report.has_failed(&category) {
                let keys: Vec<String> = keys.into_iter().collect();
                match self.store.delete_rows(&category, &keys) {
                    Ok(()) => report.rows_deleted += keys.len(),
                    Err(e) => report.fail(&category, SettingsError::store(&category, e)),
                }
            }
            invalidate.insert(category);
        }

        // 3. Saves
        for (category, values) in saves {
            if values.is_empty() {
                continue;
            }
            if !report.has_failed(&category) {
                self.save_category(&category, &values, &mut report);
            }
            invalidate.insert(category);
        }

        // 4. Registry write-back
        report.registry = self.write_registry(registry, &mut report);

        // 5. Invalidate changed categories and everything dropped from the registry
        invalidate.extend(registry.removed().iter().cloned());
        for category in &invalidate {
            let cache_key = self.keys.category(category);
            if let Err(e) = self.cache.delete(&cache_key) {
                warn!("Failed to invalidate cache entry '{}': {}", cache_key, e);
                report.cache_errors += 1;
            }
        }
        registry.clear_removed();
        report.invalidated = invalidate;

        info!(
            "Flushed settings: {} categories deleted, {} rows deleted, {} rows saved, {} cache entries invalidated, {} failures",
            report.categories_deleted,
            report.rows_deleted,
            report.rows_saved,
            report.invalidated.len(),
            report.failures.len()
        );
        report
    }

    fn save_category(
        &self,
        category: &str,
        values: &BTreeMap<String, Value>,
        report: &mut FlushReport,
    ) {
        let mut encode_failed = None;
        for (key, value) in values {
            let bytes = match self.codec.encode(value) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unencodable value {}/{}: {}", category, key, e);
                    encode_failed.get_or_insert_with(|| {
                        SettingsError::codec(format!("{category}/{key}"), e)
                    });
                    continue;
                }
            };
            if let Err(e) = self.store.upsert_row(category, key, &bytes) {
                report.fail(category, SettingsError::store(category, e));
                return;
            }
            report.rows_saved += 1;
        }
        if let Some(error) = encode_failed {
            report.fail(category, error);
        }
    }

    fn write_registry(
        &self,
        registry: &mut CacheRegistry,
        report: &mut FlushReport,
    ) -> RegistryAction {
        match registry.diff() {
            RegistryChange::Unchanged => RegistryAction::None,
            RegistryChange::Drop => match self.cache.delete(registry.cache_key()) {
                Ok(()) => {
                    registry.mark_persisted();
                    RegistryAction::Dropped
                }
                Err(e) => {
                    warn!("Failed to delete cache registry '{}': {}", registry.cache_key(), e);
                    report.cache_errors += 1;
                    RegistryAction::None
                }
            },
            RegistryChange::Rewrite(names) => {
                let written = self
                    .codec
                    .encode_names(&names)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        self.cache
                            .set(registry.cache_key(), bytes, self.ttl)
                            .map_err(|e| e.to_string())
                    });
                match written {
                    Ok(()) => {
                        registry.mark_persisted();
                        RegistryAction::Rewritten(names.len())
                    }
                    Err(e) => {
                        warn!("Failed to write cache registry '{}': {}", registry.cache_key(), e);
                        report.cache_errors += 1;
                        RegistryAction::None
                    }
                }
            }
        }
    }
}
