//! Cache key derivation
//!
//! Per-category entries live under `"<category>_<cache_id>"` and the
//! registry under `"__cache_registry_<cache_id>"`, so several settings
//! domains can share one cache backend.

const REGISTRY_PREFIX: &str = "__cache_registry_";

/// Derives cache keys for one cache namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKeys {
    cache_id: String,
}

impl CacheKeys {
    pub fn new(cache_id: impl Into<String>) -> Self {
        Self {
            cache_id: cache_id.into(),
        }
    }

    #[must_use]
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Cache key holding a category's rows
    #[must_use]
    pub fn category(&self, category: &str) -> String {
        format!("{category}_{}", self.cache_id)
    }

    /// Cache key holding the registry of cached categories
    #[must_use]
    pub fn registry(&self) -> String {
        format!("{REGISTRY_PREFIX}{}", self.cache_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let keys = CacheKeys::new("global_settings");
        assert_eq!(keys.category("system"), "system_global_settings");
        assert_eq!(keys.registry(), "__cache_registry_global_settings");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let a = CacheKeys::new("tenant_a");
        let b = CacheKeys::new("tenant_b");
        assert_ne!(a.category("ui"), b.category("ui"));
        assert_ne!(a.registry(), b.registry());
    }
}
