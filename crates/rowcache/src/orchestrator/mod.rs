//! The read-through cache.
//!
//! [`QueryCache`] ties reflection, admission, tagging, hashing, the cache
//! store and invalidation together for one statement execution at a time.
//!
//! # Read path
//!
//! A read that is not admitted executes directly. Otherwise its key and tags
//! are computed, with the tags of every `IN (subquery)` statement merged in.
//! A hit returns the stored value and re-adds the key to every tag (so
//! membership lost to expiry or a concurrent invalidation heals). A miss
//! executes the statement and stores the result.
//!
//! # Write path
//!
//! A write executes first. On success its tags are invalidated at once, or,
//! while a transaction is open on its connection, queued until the outermost
//! commit. A rollback discards the queue.
//!
//! # Failure policy
//!
//! Nothing in here fails the caller's statement. Reflection problems bypass
//! the cache, store failures degrade to a miss or a skipped store, corrupt
//! entries count as misses, and invalidation failures are logged. The
//! executor's own error is returned unchanged.

mod pending;

use std::collections::BTreeSet;
use std::sync::Arc;

use rowcache_core::{CacheValue, ConnectionId, Statement, StatementKind};
use rowcache_storage::KeyValueStore;
use tracing::{debug, warn};

use crate::admission::AdmissionManager;
use crate::cache::{CacheMetrics, CacheStore, Invalidator, Lookup};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::hasher::QueryCacheKey;
use crate::reflect::{nested_statements, reflect, StatementReflection};
use crate::tagger::{Tag, Tagger};

pub use pending::TransactionRegistry;

/// A read-through query result cache over a shared store.
///
/// # Example
///
/// ```
/// use rowcache::{CacheConfig, QueryCache};
/// use rowcache_core::{Payload, Statement, StatementKind};
/// use rowcache_storage::MemoryStore;
///
/// let cache = QueryCache::new(MemoryStore::new(), CacheConfig::default()).unwrap();
/// let select = Statement::new("shop").from_table("cars").where_eq("id", 10)
///     .sql("select * from cars where id = ?").bind(10);
///
/// // Miss: executes and stores
/// let rows: Result<Payload, ()> = cache.read(&select, || Ok(Payload::from("Volvo")));
/// // Hit: the closure does not run
/// let cached: Result<Payload, ()> = cache.read(&select, || unreachable!());
/// assert_eq!(rows, cached);
///
/// let update = Statement::new("shop").kind(StatementKind::Update)
///     .from_table("cars").where_eq("id", 10);
/// let _: Result<(), ()> = cache.write(&update, || Ok(()));
/// assert_eq!(cache.metrics().invalidations(), 1);
/// ```
#[derive(Debug)]
pub struct QueryCache<S> {
    config: CacheConfig,
    store: CacheStore<S>,
    admission: AdmissionManager,
    tagger: Tagger,
    transactions: TransactionRegistry,
    metrics: Arc<CacheMetrics>,
}

/// Key and tags of an admitted read.
struct ReadPlan {
    key: QueryCacheKey,
    tags: BTreeSet<Tag>,
}

impl<S: KeyValueStore> QueryCache<S> {
    /// Create a cache over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// does not validate.
    pub fn new(store: S, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: CacheStore::new(store, config.prefix.clone()),
            admission: AdmissionManager::new(&config),
            tagger: Tagger::new(config.consider_rows),
            transactions: TransactionRegistry::new(),
            metrics: Arc::new(CacheMetrics::new()),
            config,
        })
    }

    /// Get the cache configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the cache store.
    #[must_use]
    pub fn store(&self) -> &CacheStore<S> {
        &self.store
    }

    /// Get the cache metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether a transaction is open on `connection`.
    #[must_use]
    pub fn in_transaction(&self, connection: &ConnectionId) -> bool {
        self.transactions.is_open(connection)
    }

    /// Execute a read through the cache.
    ///
    /// `execute` runs only when the read bypasses the cache or misses.
    ///
    /// # Errors
    ///
    /// Returns exactly the error `execute` returns; the cache adds none.
    pub fn read<V, E, F>(&self, statement: &Statement, execute: F) -> std::result::Result<V, E>
    where
        V: CacheValue,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        let Some(plan) = self.plan_read(statement) else {
            self.metrics.record_bypass();
            return execute();
        };

        match self.store.lookup::<V>(&plan.key) {
            Ok(Lookup::Hit(value)) => {
                self.metrics.record_hit();
                debug!(key = %plan.key, "cache hit");
                match self.store.repair_tag_membership(&plan.key, &plan.tags) {
                    Ok(healed) => self.metrics.record_heals(healed),
                    Err(e) => {
                        self.metrics.record_store_error();
                        warn!(key = %plan.key, error = %e, "failed to repair tag membership");
                    }
                }
                return Ok(value);
            }
            Ok(Lookup::Miss) => debug!(key = %plan.key, "cache miss"),
            Ok(Lookup::Undecodable) => {
                warn!(key = %plan.key, "cached entry is undecodable, treating as a miss");
            }
            Err(e) => {
                self.metrics.record_store_error();
                warn!(key = %plan.key, error = %e, "cache lookup failed, treating as a miss");
            }
        }
        self.metrics.record_miss();

        let value = execute()?;
        match self.store.set(&plan.key, &plan.tags, &value, self.config.ttl()) {
            Ok(()) => self.metrics.record_store(),
            Err(e) => {
                self.metrics.record_store_error();
                warn!(key = %plan.key, error = %e, "failed to store cache entry");
            }
        }
        Ok(value)
    }

    /// Execute a write and invalidate what it affects.
    ///
    /// Nothing is invalidated if `execute` fails.
    ///
    /// # Errors
    ///
    /// Returns exactly the error `execute` returns; the cache adds none.
    pub fn write<T, E, F>(&self, statement: &Statement, execute: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let output = execute()?;

        let reflection = match reflect(statement) {
            Ok(reflection) => reflection,
            Err(e) => {
                // The write happened; without a kind only a table-wide
                // invalidation is safe
                warn!(error = %e, "malformed write statement, invalidating its tables entirely");
                match reflect(&statement.clone().kind(StatementKind::Truncate)) {
                    Ok(reflection) => reflection,
                    Err(e) => {
                        warn!(error = %e, "write statement could not be reflected");
                        return Ok(output);
                    }
                }
            }
        };

        let tables = self.admission.admitted_tables(&reflection);
        if tables.is_empty() {
            self.metrics.record_bypass();
            return Ok(output);
        }
        let tags = self.tagger.tags_for_tables(&reflection, tables);

        if self.transactions.enqueue(reflection.connection(), &tags) {
            debug!(
                connection = %reflection.connection(),
                tags = tags.len(),
                "deferred invalidation until commit"
            );
        } else {
            self.invalidate_tags(&tags);
        }
        Ok(output)
    }

    /// Open a (possibly nested) transaction on `connection`.
    ///
    /// Until the outermost level commits or rolls back, reads on the
    /// connection bypass the cache and writes queue their invalidations.
    pub fn begin_transaction(&self, connection: &ConnectionId) {
        let depth = self.transactions.begin(connection);
        debug!(connection = %connection, depth, "transaction opened");
    }

    /// Commit one transaction level. When the outermost level commits, the
    /// queued invalidations run in one pass.
    ///
    /// Returns the keys invalidated.
    pub fn commit_transaction(&self, connection: &ConnectionId) -> BTreeSet<QueryCacheKey> {
        match self.transactions.commit(connection) {
            Some(tags) => self.invalidate_tags(&tags),
            None => BTreeSet::new(),
        }
    }

    /// Roll back one transaction level. When the outermost level rolls back,
    /// the queued invalidations are discarded.
    ///
    /// Returns the number of queued tags discarded.
    pub fn rollback_transaction(&self, connection: &ConnectionId) -> usize {
        let discarded = self.transactions.rollback(connection);
        if discarded > 0 {
            debug!(connection = %connection, discarded, "discarded deferred invalidation");
        }
        discarded
    }

    /// Run the queued invalidations of `connection` now, leaving its
    /// transaction depth alone.
    ///
    /// For integrations that observe commits themselves instead of calling
    /// [`commit_transaction`](Self::commit_transaction).
    pub fn flush_pending_invalidations(
        &self,
        connection: &ConnectionId,
    ) -> BTreeSet<QueryCacheKey> {
        let tags = self.transactions.take_pending(connection);
        self.invalidate_tags(&tags)
    }

    /// Drop the queued invalidations of `connection`, leaving its transaction
    /// depth alone. Returns the number of tags dropped.
    pub fn discard_pending_invalidations(&self, connection: &ConnectionId) -> usize {
        self.transactions.discard_pending(connection)
    }

    /// Evict every cached read of the given tables, whatever its shape.
    pub fn invalidate_tables<'t>(
        &self,
        database: &str,
        tables: impl IntoIterator<Item = &'t str>,
    ) -> BTreeSet<QueryCacheKey> {
        let tags: BTreeSet<Tag> =
            tables.into_iter().flat_map(|table| self.tagger.table_wide(database, table)).collect();
        self.invalidate_tags(&tags)
    }

    /// Remove every entry and tag under the cache namespace.
    ///
    /// Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn flush(&self) -> Result<usize> {
        self.store.flush()
    }

    fn invalidate_tags(&self, tags: &BTreeSet<Tag>) -> BTreeSet<QueryCacheKey> {
        if tags.is_empty() {
            return BTreeSet::new();
        }
        let removed = Invalidator::new(&self.store).invalidate(tags);
        self.metrics.record_invalidations(removed.len());
        removed
    }

    /// Reflect and admit a read, or `None` to bypass the cache.
    fn plan_read(&self, statement: &Statement) -> Option<ReadPlan> {
        let reflection = reflect_logged(statement)?;
        let transaction_open = self.transactions.is_open(reflection.connection());
        if !self.admission.should_cache(&reflection, transaction_open) {
            debug!(tables = ?reflection.tables(), transaction_open, "read not admitted");
            return None;
        }

        let mut tags = self.tagger.tags(&reflection);
        for nested in nested_statements(statement) {
            let nested = reflect_logged(nested)?;
            if !self.admission.should_cache(&nested, false) {
                debug!(tables = ?nested.tables(), "subquery not admitted");
                return None;
            }
            tags.extend(self.tagger.tags(&nested));
        }

        Some(ReadPlan { key: QueryCacheKey::new(&reflection), tags })
    }
}

fn reflect_logged(statement: &Statement) -> Option<StatementReflection> {
    match reflect(statement) {
        Ok(reflection) => Some(reflection),
        Err(e) => {
            warn!(error = %e, "bypassing cache");
            None
        }
    }
}
