//! Configuration types for setbuf
//!
//! All fields have defaults and can be overridden before the first session
//! is created. Invalid values are rejected when they are set.

use crate::codec::CodecKind;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Category used when callers don't name one
pub const DEFAULT_CATEGORY: &str = "system";

/// Cache namespace shared by all categories of one settings domain
pub const DEFAULT_CACHE_ID: &str = "global_settings";

/// Backing-store table holding the settings rows
pub const DEFAULT_TABLE_NAME: &str = "settings";

const MAX_TABLE_NAME_LEN: usize = 64;

/// Settings store configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Namespace suffix for every cache key
    pub cache_id: String,
    /// Cache entry lifetime in seconds (0 = never expire)
    pub cache_ttl_secs: u64,
    /// Backing-store table name
    pub table_name: String,
    /// Value serialization format
    pub codec: CodecKind,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            cache_id: DEFAULT_CACHE_ID.to_string(),
            cache_ttl_secs: 0,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            codec: CodecKind::default(),
        }
    }
}

impl SettingsConfig {
    /// Set the cache namespace. An empty id keeps the current one.
    pub fn with_cache_id(mut self, cache_id: impl Into<String>) -> ConfigResult<Self> {
        let cache_id = cache_id.into();
        if cache_id.is_empty() {
            return Ok(self);
        }
        validate_cache_id(&cache_id)?;
        self.cache_id = cache_id;
        Ok(self)
    }

    /// Set the cache lifetime. Zero or negative means entries never expire.
    #[must_use]
    pub fn with_cache_ttl_secs(mut self, secs: i64) -> Self {
        self.cache_ttl_secs = u64::try_from(secs).unwrap_or(0);
        self
    }

    /// Set the backing-store table name
    pub fn with_table_name(mut self, name: impl Into<String>) -> ConfigResult<Self> {
        let name = name.into();
        validate_table_name(&name)?;
        self.table_name = name;
        Ok(self)
    }

    #[must_use]
    pub const fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Cache lifetime as passed to the cache adapter
    #[must_use]
    pub const fn cache_ttl(&self) -> Option<Duration> {
        if self.cache_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.cache_ttl_secs))
        }
    }

    /// Check a configuration assembled by deserialization
    pub fn validate(&self) -> ConfigResult<()> {
        validate_cache_id(&self.cache_id)?;
        validate_table_name(&self.table_name)
    }
}

fn validate_cache_id(cache_id: &str) -> ConfigResult<()> {
    if cache_id.is_empty() || cache_id.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidCacheId(cache_id.to_string()));
    }
    Ok(())
}

fn validate_table_name(name: &str) -> ConfigResult<()> {
    let invalid = |reason| ConfigError::InvalidTableName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_TABLE_NAME_LEN {
        return Err(invalid("longer than 64 characters"));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("must not start with a digit"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("only ASCII letters, digits and '_' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SettingsConfig::default();
        assert_eq!(config.cache_id, "global_settings");
        assert_eq!(config.cache_ttl(), None);
        assert_eq!(config.table_name, "settings");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_cache_id_keeps_current() {
        let config = SettingsConfig::default()
            .with_cache_id("tenant_a")
            .unwrap()
            .with_cache_id("")
            .unwrap();
        assert_eq!(config.cache_id, "tenant_a");
        assert!(SettingsConfig::default().with_cache_id("a b").is_err());
    }

    #[test]
    fn test_ttl_clamps_negative() {
        let config = SettingsConfig::default().with_cache_ttl_secs(-5);
        assert_eq!(config.cache_ttl_secs, 0);
        assert_eq!(config.cache_ttl(), None);

        let config = config.with_cache_ttl_secs(60);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_table_name_rejected_eagerly() {
        for bad in ["", "{{settings}}", "9lives", "has space", "x".repeat(65).as_str()] {
            assert!(
                SettingsConfig::default().with_table_name(bad).is_err(),
                "accepted {bad:?}"
            );
        }
        let config = SettingsConfig::default().with_table_name("app_settings").unwrap();
        assert_eq!(config.table_name, "app_settings");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SettingsConfig =
            serde_json::from_str(r#"{"cache_ttl_secs": 30, "codec": "json"}"#).unwrap();
        assert_eq!(config.cache_ttl_secs, 30);
        assert_eq!(config.codec, CodecKind::Json);
        assert_eq!(config.table_name, DEFAULT_TABLE_NAME);
    }
}
