//! Error types shared by the setbuf crates

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Result type for configuration validation
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A value could not be encoded for storage, or stored bytes could not be decoded
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected value shape: expected {expected}, got {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Configuration rejected at the time it was set
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: &'static str },

    #[error("invalid cache id '{0}': must not contain whitespace")]
    InvalidCacheId(String),

    #[error("unknown codec: {0}")]
    UnknownCodec(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidTableName {
            name: "bad name".into(),
            reason: "whitespace",
        };
        assert_eq!(err.to_string(), "invalid table name 'bad name': whitespace");

        let err = CodecError::UnexpectedShape {
            expected: "map",
            actual: "int",
        };
        assert!(err.to_string().contains("expected map"));
    }
}
