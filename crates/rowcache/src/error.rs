//! Error types for `rowcache`.
//!
//! This module provides the [`enum@Error`] type returned by the fallible
//! building blocks (reflection, configuration, direct store access). The
//! [`QueryCache`](crate::QueryCache) read and write paths never return it:
//! they log and degrade instead.

use thiserror::Error;

/// Errors that can occur when using `rowcache`.
#[derive(Debug, Error)]
pub enum Error {
    /// The statement description could not be reflected.
    #[error("malformed statement: {0}")]
    MalformedStatement(String),

    /// A configuration error occurred.
    #[error("configuration error: {0}")]
    Config(String),

    /// A store error occurred.
    #[error("storage error: {0}")]
    Storage(#[from] rowcache_storage::StorageError),

    /// A core error occurred.
    #[error("core error: {0}")]
    Core(#[from] rowcache_core::CoreError),
}

impl Error {
    /// Create a malformed statement error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedStatement(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias for `rowcache` operations.
pub type Result<T> = std::result::Result<T, Error>;
