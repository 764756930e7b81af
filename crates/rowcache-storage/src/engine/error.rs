//! Storage error types.

use thiserror::Error;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or the connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A key holds a value of the wrong type for the command.
    #[error("wrong type for key '{0}'")]
    WrongType(String),

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),

    /// A Redis error occurred.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StorageError {
    /// Create a lock poisoned error.
    #[must_use]
    pub fn lock_poisoned(msg: impl Into<String>) -> Self {
        Self::LockPoisoned(msg.into())
    }
}

/// A specialized `Result` type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;
