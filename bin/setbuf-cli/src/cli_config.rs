//! CLI configuration
//!
//! Layered from lowest to highest priority: built-in defaults, an optional
//! TOML file, `SETBUF_*` environment variables, command-line flags.
//!
//! ```toml
//! store_path = "/var/lib/setbuf/settings.redb"
//! cache_path = "/var/lib/setbuf/cache.redb"
//!
//! [settings]
//! cache_id = "global_settings"
//! cache_ttl_secs = 3600
//! codec = "json"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `SETBUF_SETTINGS__CACHE_TTL_SECS=60`.

use anyhow::{Context, Result};
use serde::Deserialize;
use setbuf_common::SettingsConfig;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SETBUF";

/// Everything the CLI needs to open a settings domain
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// redb file holding the settings rows
    pub store_path: PathBuf,
    /// redb file holding cache entries
    pub cache_path: PathBuf,
    pub settings: SettingsConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("setbuf.redb"),
            cache_path: PathBuf::from("setbuf-cache.redb"),
            settings: SettingsConfig::default(),
        }
    }
}

impl CliConfig {
    /// Read the optional file at `path`, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize::<Self>()
            .context("Invalid configuration")?;
        config.settings.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setbuf_common::CodecKind;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.settings.table_name, "settings");
        assert_eq!(config.store_path, PathBuf::from("setbuf.redb"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setbuf.toml");
        std::fs::write(
            &path,
            r#"
store_path = "/tmp/a.redb"

[settings]
cache_id = "tenant_a"
cache_ttl_secs = 30
codec = "json"
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/a.redb"));
        assert_eq!(config.cache_path, PathBuf::from("setbuf-cache.redb"));
        assert_eq!(config.settings.cache_id, "tenant_a");
        assert_eq!(config.settings.cache_ttl_secs, 30);
        assert_eq!(config.settings.codec, CodecKind::Json);
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setbuf.toml");
        std::fs::write(&path, "[settings]\ntable_name = \"drop table\"\n").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
