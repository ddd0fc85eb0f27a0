//! Cache error types

use thiserror::Error;

/// Cache error
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache backend cannot be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Entry envelope could not be encoded or decoded
    #[error("Cache entry encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for CacheError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
