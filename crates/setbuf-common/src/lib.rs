//! setbuf Common - Shared types and utilities
//!
//! This crate provides the setting value type, the pluggable value codecs,
//! configuration, and cache key derivation used across all setbuf crates.

pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod value;

pub use codec::{BincodeCodec, Codec, CodecKind, JsonCodec};
pub use config::{DEFAULT_CACHE_ID, DEFAULT_CATEGORY, DEFAULT_TABLE_NAME, SettingsConfig};
pub use error::{CodecError, CodecResult, ConfigError, ConfigResult};
pub use keys::CacheKeys;
pub use value::Value;
