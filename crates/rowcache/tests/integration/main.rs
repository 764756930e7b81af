//! Integration tests for rowcache.
//!
//! These tests drive [`rowcache::QueryCache`] end to end against the
//! in-memory store: reads and writes described as structured statements,
//! executors that count their calls, and direct inspection of the store.

pub mod admission;
pub mod common;
pub mod config;
pub mod invalidation;
pub mod resilience;
pub mod transactions;
