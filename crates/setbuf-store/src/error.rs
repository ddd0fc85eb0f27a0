//! Error types for backing store operations

/// Error type for backing store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
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
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] setbuf_common::ConfigError),
    #[error("row already exists: {category}/{key}")]
    RowExists { category: String, key: String },
    #[error("row not found: {category}/{key}")]
    RowNotFound { category: String, key: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
