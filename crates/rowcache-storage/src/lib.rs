//! `rowcache` Storage
//!
//! This crate provides the store abstraction and backend implementations for
//! `rowcache`.
//!
//! # Overview
//!
//! The cache needs a small set of primitives from a shared key/value and set
//! store: values with optional expiry, string sets used as tag membership
//! lists, and one atomic "read the members of a set, then delete it" step.
//! [`KeyValueStore`] names exactly those primitives, so a backend is a plain
//! trait implementation rather than a proxy over an arbitrary client.
//!
//! # Error Handling
//!
//! All store operations return [`StorageResult<T>`], which is an alias for
//! `Result<T, StorageError>`.
//!
//! # Example
//!
//! ```
//! use rowcache_storage::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("rowcache:k1", b"payload", None).unwrap();
//! store.sadd("rowcache:db:shop:table_unspecific:cars", "rowcache:k1").unwrap();
//!
//! let members = store.take_members("rowcache:db:shop:table_unspecific:cars").unwrap();
//! assert_eq!(members, vec!["rowcache:k1".to_owned()]);
//! assert!(!store.exists("rowcache:db:shop:table_unspecific:cars").unwrap());
//! ```
//!
//! # Modules
//!
//! - [`engine`] - The store trait and error types
//! - [`backends`] - Concrete store implementations

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;

pub use backends::MemoryStore;
#[cfg(feature = "redis")]
pub use backends::RedisStore;
pub use engine::{KeyValueStore, StorageError, StorageResult};
