//! Deferred invalidation inside transactions.

use rowcache::CacheConfig;
use rowcache_core::{ConnectionId, StatementKind};

use super::common::{memory_cache, select_car, write, write_cars, Executions};

#[test]
fn test_transaction_deferral() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let tx = ConnectionId::from("tx");

    // Cached outside the transaction, by another connection
    reads.read(&cache, &select_car(11), "car 11");

    cache.begin_transaction(&tx);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11).connection("tx"));

    // Other connections still see the pre-update cached value
    reads.read(&cache, &select_car(11), "car 11 (stale)");
    assert_eq!(reads.count(), 1);

    let removed = cache.commit_transaction(&tx);
    assert_eq!(removed.len(), 1);

    reads.read(&cache, &select_car(11), "car 11 updated");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_reads_inside_transaction_bypass() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let tx = ConnectionId::from("tx");

    reads.read(&cache, &select_car(11), "car 11");

    cache.begin_transaction(&tx);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11).connection("tx"));

    // The writing connection must not trust the cache
    reads.read(&cache, &select_car(11).connection("tx"), "car 11 updated");
    assert_eq!(reads.count(), 2);
    assert_eq!(cache.metrics().bypasses(), 1);

    cache.commit_transaction(&tx);
}

#[test]
fn test_rollback_discards_queue() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let tx = ConnectionId::from("tx");

    reads.read(&cache, &select_car(11), "car 11");

    cache.begin_transaction(&tx);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11).connection("tx"));
    assert_eq!(cache.rollback_transaction(&tx), 2);
    assert!(!cache.in_transaction(&tx));

    // The update never happened, so the cached read is still right
    reads.read(&cache, &select_car(11), "car 11");
    assert_eq!(reads.count(), 1);
    assert_eq!(cache.metrics().invalidations(), 0);
}

#[test]
fn test_nested_transactions() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let tx = ConnectionId::from("tx");

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(11), "car 11");

    cache.begin_transaction(&tx);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10).connection("tx"));

    cache.begin_transaction(&tx);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11).connection("tx"));
    // Inner rollback keeps what was queued
    assert_eq!(cache.rollback_transaction(&tx), 0);

    // Inner commit of another savepoint does not flush yet
    cache.begin_transaction(&tx);
    assert!(cache.commit_transaction(&tx).is_empty());
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);

    assert_eq!(cache.commit_transaction(&tx).len(), 2);
    reads.read(&cache, &select_car(10), "car 10 updated");
    reads.read(&cache, &select_car(11), "car 11");
    assert_eq!(reads.count(), 4);
}

#[test]
fn test_explicit_flush_and_discard() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let tx = ConnectionId::from("tx");

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(11), "car 11");

    cache.begin_transaction(&tx);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10).connection("tx"));
    assert_eq!(cache.flush_pending_invalidations(&tx).len(), 1);
    assert!(cache.in_transaction(&tx));

    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11).connection("tx"));
    assert_eq!(cache.discard_pending_invalidations(&tx), 2);
    assert!(cache.commit_transaction(&tx).is_empty());

    reads.read(&cache, &select_car(10), "car 10 updated");
    reads.read(&cache, &select_car(11), "car 11");
    assert_eq!(reads.count(), 3);
}

#[test]
fn test_transactions_are_per_connection() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    cache.begin_transaction(&ConnectionId::from("tx"));

    // A write on another connection invalidates immediately
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10).connection("other"));
    reads.read(&cache, &select_car(10), "car 10 updated");
    assert_eq!(reads.count(), 2);

    cache.rollback_transaction(&ConnectionId::from("tx"));
}
