//! Cache registry
//!
//! Tracks which categories currently have a cache entry, so every cached
//! category can be invalidated without scanning the backing store. The
//! registry is itself a cache entry; it is read at most once per session and
//! written back at flush only if the working set changed.

use setbuf_cache::SettingsCache;
use setbuf_common::Codec;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a flush must do with the registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    /// No cache write
    Unchanged,
    /// Rewrite the entry with this set
    Rewrite(BTreeSet<String>),
    /// Delete the entry: nothing is tracked anymore
    Drop,
}

#[derive(Debug, Default)]
struct Snapshot {
    /// Set read from the cache at session start
    initial: BTreeSet<String>,
    /// Set after this session's additions and removals
    working: BTreeSet<String>,
    /// Cache read failed; the initial set is unknown
    degraded: bool,
}

/// Session view of the categories held in the cache
pub struct CacheRegistry {
    cache: Arc<dyn SettingsCache>,
    codec: Arc<dyn Codec>,
    cache_key: String,
    snapshot: Option<Snapshot>,
    removed: BTreeSet<String>,
}

impl CacheRegistry {
    pub fn new(cache: Arc<dyn SettingsCache>, codec: Arc<dyn Codec>, cache_key: String) -> Self {
        Self {
            cache,
            codec,
            cache_key,
            snapshot: None,
            removed: BTreeSet::new(),
        }
    }

    /// Cache key the registry is stored under
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Working set, reading the registry entry on first use
    pub fn load(&mut self) -> &BTreeSet<String> {
        &self.snapshot_mut().working
    }

    /// Track `category` as cached
    pub fn add(&mut self, category: &str) {
        if self.snapshot_mut().working.insert(category.to_string()) {
            debug!("Registered cached category '{}'", category);
        }
    }

    /// Stop tracking `category` and schedule its cache entry for deletion.
    ///
    /// The entry is scheduled even when the category was not tracked.
    pub fn remove(&mut self, category: &str) {
        self.snapshot_mut().working.remove(category);
        self.removed.insert(category.to_string());
    }

    /// Stop tracking every category and schedule all their entries for deletion
    pub fn remove_all(&mut self) {
        let working = std::mem::take(&mut self.snapshot_mut().working);
        self.removed.extend(working);
    }

    /// Categories removed this session, pending cache invalidation
    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    /// Compare the working set against the set read at session start
    pub fn diff(&self) -> RegistryChange {
        let Some(snapshot) = &self.snapshot else {
            return RegistryChange::Unchanged;
        };
        if snapshot.degraded {
            return RegistryChange::Unchanged;
        }
        if snapshot.working.is_empty() && !snapshot.initial.is_empty() {
            RegistryChange::Drop
        } else if snapshot.working != snapshot.initial {
            RegistryChange::Rewrite(snapshot.working.clone())
        } else {
            RegistryChange::Unchanged
        }
    }

    /// Whether a flush has anything to do for the registry
    pub fn has_changes(&self) -> bool {
        !self.removed.is_empty() || self.diff() != RegistryChange::Unchanged
    }

    /// Record that the registry entry now matches the working set
    pub fn mark_persisted(&mut self) {
        if let Some(snapshot) = &mut self.snapshot {
            snapshot.initial = snapshot.working.clone();
        }
    }

    /// Forget removals whose cache entries have been invalidated
    pub fn clear_removed(&mut self) {
        self.removed.clear();
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.fetch());
        }
        self.snapshot.get_or_insert_with(Snapshot::default)
    }

    fn fetch(&self) -> Snapshot {
        match self.cache.get(&self.cache_key) {
            Ok(Some(bytes)) => match self.codec.decode_names(&bytes) {
                Ok(names) => {
                    debug!("Loaded cache registry with {} categories", names.len());
                    Snapshot {
                        initial: names.clone(),
                        working: names,
                        degraded: false,
                    }
                }
                Err(e) => {
                    warn!("Ignoring undecodable cache registry '{}': {}", self.cache_key, e);
                    Snapshot::default()
                }
            },
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!("Failed to read cache registry '{}': {}", self.cache_key, e);
                Snapshot {
                    degraded: true,
                    ..Snapshot::default()
                }
            }
        }
    }
}
