//! Cache entries, tag membership, and invalidation.
//!
//! - [`CacheStore`] - entries and tag member sets under one namespace prefix
//! - [`Invalidator`] - atomic per-tag harvest followed by a bulk delete
//! - [`CacheMetrics`] - process-local counters

mod invalidator;
mod metrics;
mod store;

pub use invalidator::Invalidator;
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use store::{CacheStore, Lookup};
