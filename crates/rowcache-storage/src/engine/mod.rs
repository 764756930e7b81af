//! Store traits and abstractions.
//!
//! This module defines the capability interface every backend implements:
//!
//! - [`KeyValueStore`] - values with optional expiry, plus string sets
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`] which is an alias for
//! `Result<T, StorageError>`. See [`StorageError`] for the possible error variants.

mod error;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::KeyValueStore;
