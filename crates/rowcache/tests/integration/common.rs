//! Shared fixtures.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rowcache::{CacheConfig, QueryCache};
use rowcache_core::{Payload, Statement, StatementKind};
use rowcache_storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};

/// Route cache logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn memory_cache(config: CacheConfig) -> QueryCache<MemoryStore> {
    init_tracing();
    QueryCache::new(MemoryStore::new(), config).expect("failed to create cache")
}

pub fn select_car(id: i64) -> Statement {
    Statement::new("shop")
        .from_table("cars")
        .where_eq("id", id)
        .sql("select * from cars where id = ?")
        .bind(id)
}

pub fn select_all_cars() -> Statement {
    Statement::new("shop").from_table("cars").sql("select * from cars")
}

pub fn write_cars(kind: StatementKind) -> Statement {
    Statement::new("shop").kind(kind).from_table("cars")
}

/// Counts how often a read actually executed.
#[derive(Default)]
pub struct Executions(Cell<usize>);

impl Executions {
    pub fn count(&self) -> usize {
        self.0.get()
    }

    /// Read through `cache`, producing `value` on a miss.
    pub fn read<S: KeyValueStore>(
        &self,
        cache: &QueryCache<S>,
        statement: &Statement,
        value: &str,
    ) -> Payload {
        cache
            .read(statement, || {
                self.0.set(self.0.get() + 1);
                Ok::<_, std::convert::Infallible>(Payload::from(value))
            })
            .expect("infallible")
    }
}

/// Execute a write that always succeeds.
pub fn write<S: KeyValueStore>(cache: &QueryCache<S>, statement: &Statement) {
    cache.write(statement, || Ok::<_, std::convert::Infallible>(())).expect("infallible");
}

/// A store whose operations can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_unlink: AtomicBool,
}

impl FlakyStore {
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(flag: &AtomicBool) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::Connection("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Self::check(&self.fail_reads)?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.set(key, value, ttl)
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Self::check(&self.fail_reads)?;
        self.inner.exists(key)
    }

    fn del(&self, keys: &[String]) -> StorageResult<usize> {
        Self::check(&self.fail_writes)?;
        self.inner.del(keys)
    }

    fn unlink(&self, keys: &[String]) -> StorageResult<usize> {
        Self::check(&self.fail_unlink)?;
        self.inner.unlink(keys)
    }

    fn sadd(&self, set: &str, member: &str) -> StorageResult<bool> {
        Self::check(&self.fail_writes)?;
        self.inner.sadd(set, member)
    }

    fn smembers(&self, set: &str) -> StorageResult<Vec<String>> {
        Self::check(&self.fail_reads)?;
        self.inner.smembers(set)
    }

    fn srem(&self, set: &str, member: &str) -> StorageResult<bool> {
        Self::check(&self.fail_writes)?;
        self.inner.srem(set, member)
    }

    fn take_members(&self, set: &str) -> StorageResult<Vec<String>> {
        Self::check(&self.fail_writes)?;
        self.inner.take_members(set)
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Self::check(&self.fail_reads)?;
        self.inner.scan_prefix(prefix)
    }
}
