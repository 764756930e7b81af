//! Store backend implementations.
//!
//! - [`MemoryStore`] - in-process, single-mutex keyspace
//! - `RedisStore` - a Redis server (requires the `redis` feature)

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
