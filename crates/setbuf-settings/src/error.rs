//! Settings error types

use setbuf_common::{CodecError, ConfigError};
use setbuf_store::StoreError;
use thiserror::Error;

/// Settings error
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A value could not be encoded, or stored bytes could not be decoded
    #[error("serialization error for {context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: CodecError,
    },

    /// The backing store failed for one category
    #[error("store unavailable for category '{category}': {source}")]
    StoreUnavailable {
        category: String,
        #[source]
        source: StoreError,
    },

    /// Configuration was rejected
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// One or more categories failed to flush
    #[error("flush failed for categories: {}", .categories.join(", "))]
    FlushFailed { categories: Vec<String> },
}

impl SettingsError {
    pub(crate) fn store(category: &str, source: StoreError) -> Self {
        Self::StoreUnavailable {
            category: category.to_string(),
            source,
        }
    }

    pub(crate) fn codec(context: impl Into<String>, source: CodecError) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Category the error is scoped to, if any
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::StoreUnavailable { category, .. } => Some(category),
            _ => None,
        }
    }
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;
