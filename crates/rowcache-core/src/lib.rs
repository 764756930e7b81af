//! `rowcache` Core
//!
//! Core types shared by every `rowcache` crate.
//!
//! # Overview
//!
//! The cache never parses SQL. Instead the query-builder integration describes
//! each statement structurally with a [`Statement`]: the FROM reference, JOINs,
//! the WHERE list, UNION branches, the statement kind, and the compiled SQL and
//! bindings. This crate defines that description, the [`Scalar`] values it is
//! built from, and the [`Payload`] values the cache stores.
//!
//! # Example
//!
//! ```
//! use rowcache_core::{Statement, StatementKind};
//!
//! let select = Statement::new("shop")
//!     .from_table("cars")
//!     .where_eq("id", 10)
//!     .sql("select * from cars where id = ?")
//!     .bind(10);
//!
//! let update = Statement::new("shop")
//!     .kind(StatementKind::Update)
//!     .from_table("cars")
//!     .where_eq("id", 11);
//! # let _ = (select, update);
//! ```
//!
//! # Modules
//!
//! - [`types`] - Scalars, statement descriptions, payloads
//! - [`encoding`] - The payload codec and its native fallback
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod encoding;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use encoding::{CacheValue, Decoded, Native};
pub use error::CoreError;
pub use types::{
    ConnectionId, Connective, DeclaredKind, Operator, Payload, Predicate, Scalar, Statement,
    StatementKind, TableRef,
};
