//! # rowcache
//!
//! A transparent, read-through result cache for relational query statements
//! with automatic, row-granular invalidation.
//!
//! Callers cache the output of read statements without choosing cache keys
//! and without wiring invalidation into every write path: both are derived
//! from the structure of each statement.
//!
//! ## Pipeline
//!
//! 1. [`reflect`](reflect::reflect) walks a structured
//!    [`Statement`](rowcache_core::Statement) for its tables, the primary-key
//!    rows it pins, its SQL, bindings and kind.
//! 2. [`AdmissionManager`] decides whether caching applies at all.
//! 3. [`Tagger`] turns the reflection into invalidation [`Tag`]s.
//! 4. [`QueryCacheKey`] hashes database, SQL and bindings into a cache key.
//! 5. [`CacheStore`] keeps entries and tag membership in a shared
//!    [`KeyValueStore`](rowcache_storage::KeyValueStore).
//! 6. [`Invalidator`] atomically harvests tags and deletes their entries.
//!
//! [`QueryCache`] runs the whole pipeline for each read and write, including
//! deferred invalidation for writes inside transactions.
//!
//! ## Quick Start
//!
//! ```
//! use rowcache::{CacheConfig, QueryCache};
//! use rowcache_core::{Payload, Statement, StatementKind};
//! use rowcache_storage::MemoryStore;
//!
//! let cache = QueryCache::new(MemoryStore::new(), CacheConfig::default()).unwrap();
//!
//! let car = |id: i64| {
//!     Statement::new("shop")
//!         .from_table("cars")
//!         .where_eq("id", id)
//!         .sql("select * from cars where id = ?")
//!         .bind(id)
//! };
//!
//! let _: Result<Payload, ()> = cache.read(&car(10), || Ok(Payload::from("Volvo")));
//! let _: Result<Payload, ()> = cache.read(&car(11), || Ok(Payload::from("Saab")));
//!
//! // Updating row 11 evicts the cached read of row 11 only
//! let update = Statement::new("shop")
//!     .kind(StatementKind::Update)
//!     .from_table("cars")
//!     .where_eq("id", 11);
//! let _: Result<(), ()> = cache.write(&update, || Ok(()));
//!
//! let hit: Result<Payload, ()> = cache.read(&car(10), || unreachable!());
//! assert_eq!(hit, Ok(Payload::from("Volvo")));
//! ```
//!
//! ## Modules
//!
//! - [`reflect`] - Statement reflection
//! - [`hasher`] - Cache key derivation
//! - [`tagger`] - Invalidation tags
//! - [`cache`] - Cache store, invalidator, metrics
//! - [`admission`] - Admission decisions
//! - [`orchestrator`] - The read-through cache and transaction tracking
//! - [`config`] - Configuration

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod admission;
pub mod cache;
pub mod config;
pub mod error;
pub mod hasher;
pub mod orchestrator;
pub mod reflect;
pub mod tagger;

pub use admission::AdmissionManager;
pub use cache::{CacheMetrics, CacheStore, Invalidator, Lookup, MetricsSnapshot};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use hasher::{cache_key, QueryCacheKey};
pub use orchestrator::{QueryCache, TransactionRegistry};
pub use reflect::{reflect, StatementReflection};
pub use tagger::{Tag, Tagger};

// Re-export the building blocks callers need alongside the cache
pub use rowcache_core::{
    CacheValue, ConnectionId, Native, Payload, Predicate, Scalar, Statement, StatementKind,
    TableRef,
};
pub use rowcache_storage::{KeyValueStore, MemoryStore};
