//! Shared adapters and configuration for settings sessions

use crate::error::SettingsResult;
use crate::registry::CacheRegistry;
use crate::settings::Settings;
use setbuf_cache::SettingsCache;
use setbuf_common::{CacheKeys, Codec, SettingsConfig};
use setbuf_store::SettingsStore;
use std::sync::Arc;
use std::time::Duration;

/// Store, cache and codec shared by every session of one settings domain.
///
/// Cheap to clone; hand one to each unit of work and call `session()`.
#[derive(Clone)]
pub struct SettingsBackend {
    store: Arc<dyn SettingsStore>,
    cache: Arc<dyn SettingsCache>,
    codec: Arc<dyn Codec>,
    config: SettingsConfig,
    keys: CacheKeys,
}

impl SettingsBackend {
    /// Validate `config` and bind it to the given adapters
    pub fn new(
        store: Arc<dyn SettingsStore>,
        cache: Arc<dyn SettingsCache>,
        config: SettingsConfig,
    ) -> SettingsResult<Self> {
        config.validate()?;
        let codec = config.codec.build();
        let keys = CacheKeys::new(config.cache_id.clone());
        Ok(Self {
            store,
            cache,
            codec,
            config,
            keys,
        })
    }

    /// Start a new unit of work
    pub fn session(&self) -> Settings {
        Settings::new(self.clone())
    }

    pub fn store(&self) -> &dyn SettingsStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &dyn SettingsCache {
        self.cache.as_ref()
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub fn config(&self) -> &SettingsConfig {
        &self.config
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub(crate) fn cache_ttl(&self) -> Option<Duration> {
        self.config.cache_ttl()
    }

    pub(crate) fn registry(&self) -> CacheRegistry {
        CacheRegistry::new(self.cache.clone(), self.codec.clone(), self.keys.registry())
    }
}

impl std::fmt::Debug for SettingsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsBackend")
            .field("codec", &self.codec.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;
    use setbuf_cache::MemoryCache;
    use setbuf_common::CodecKind;
    use setbuf_store::MemoryStore;

    #[test]
    fn test_rejects_invalid_config() {
        let config = SettingsConfig {
            table_name: "1bad".to_string(),
            ..SettingsConfig::default()
        };
        let result = SettingsBackend::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
            config,
        );
        assert!(matches!(result, Err(SettingsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_codec_and_keys_follow_config() {
        let config = SettingsConfig::default()
            .with_cache_id("tenant_a")
            .unwrap()
            .with_codec(CodecKind::Json);
        let backend = SettingsBackend::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
            config,
        )
        .unwrap();

        assert_eq!(backend.codec().name(), "json");
        assert_eq!(backend.keys().category("ui"), "ui_tenant_a");
        assert_eq!(backend.keys().registry(), "__cache_registry_tenant_a");
        assert_eq!(backend.cache_ttl(), None);
    }
}
