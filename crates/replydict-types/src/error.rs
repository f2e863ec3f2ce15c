use thiserror::Error;

/// Errors from document store operations and sequenced collections.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller supplied something the operation refuses before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// A collection declaration is malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The allocator was invoked for a collection without a counter record.
    #[error("no sequence counter for collection '{0}'")]
    CounterNotFound(String),

    /// A unique index rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("document store error: {0}")]
    Backend(String),
}

/// Errors from repository operations (used by trait definitions in replydict-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to keyword dictionary operations.
#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("keyword and reply must not be empty")]
    EmptyInput,

    #[error("invalid limit: {0}")]
    InvalidLimit(i64),

    #[error("invalid id range: {start}..={end}")]
    InvalidRange { start: i32, end: i32 },

    #[error("storage error: {0}")]
    StorageError(#[from] RepositoryError),
}
