//! The cache degrades instead of failing the caller's statement.

use std::sync::atomic::Ordering;

use rowcache::{cache_key, reflect, CacheConfig, QueryCache};
use rowcache_core::{Payload, StatementKind};
use rowcache_storage::KeyValueStore;

use super::common::{init_tracing, select_car, write, write_cars, Executions, FlakyStore};

fn flaky_cache() -> QueryCache<FlakyStore> {
    init_tracing();
    QueryCache::new(FlakyStore::default(), CacheConfig::default()).expect("cache")
}

fn entry_key(id: i64) -> String {
    format!("rowcache:{}", cache_key(&reflect(&select_car(id)).expect("reflect")))
}

#[test]
fn test_lookup_failure_executes() {
    let cache = flaky_cache();
    let reads = Executions::default();
    reads.read(&cache, &select_car(10), "car 10");

    cache.store().backend().fail_reads.store(true, Ordering::SeqCst);
    let value = reads.read(&cache, &select_car(10), "car 10 live");

    assert_eq!(value, Payload::from("car 10 live"));
    assert_eq!(reads.count(), 2);
    assert_eq!(cache.metrics().store_errors(), 1);
}

#[test]
fn test_store_failure_still_returns_value() {
    let cache = flaky_cache();
    let reads = Executions::default();

    cache.store().backend().fail_writes.store(true, Ordering::SeqCst);
    let value = reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(value, Payload::from("car 10"));
    assert_eq!(cache.metrics().stores(), 0);
    assert_eq!(cache.metrics().store_errors(), 1);

    cache.store().backend().fail_writes.store(false, Ordering::SeqCst);
    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_repair_failure_still_hits() {
    let cache = flaky_cache();
    let reads = Executions::default();
    reads.read(&cache, &select_car(10), "car 10");

    cache.store().backend().fail_writes.store(true, Ordering::SeqCst);
    let value = reads.read(&cache, &select_car(10), "ignored");
    assert_eq!(value, Payload::from("car 10"));
    assert_eq!(reads.count(), 1);
    assert_eq!(cache.metrics().hits(), 1);
    assert_eq!(cache.metrics().store_errors(), 1);
}

#[test]
fn test_unlink_failure_falls_back_to_delete() {
    let cache = flaky_cache();
    let reads = Executions::default();
    reads.read(&cache, &select_car(10), "car 10");

    cache.store().backend().fail_unlink.store(true, Ordering::SeqCst);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10));

    assert!(!cache.store().backend().inner().exists(&entry_key(10)).expect("exists"));
    reads.read(&cache, &select_car(10), "car 10 updated");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_harvest_failure_does_not_fail_write() {
    let cache = flaky_cache();
    let reads = Executions::default();
    reads.read(&cache, &select_car(10), "car 10");

    cache.store().backend().fail_writes.store(true, Ordering::SeqCst);
    let result: Result<u64, ()> =
        cache.write(&write_cars(StatementKind::Update).where_eq("id", 10), || Ok(1));
    assert_eq!(result, Ok(1));
    assert_eq!(cache.metrics().invalidations(), 0);

    // The membership survived, so the next successful write still finds it
    cache.store().backend().fail_writes.store(false, Ordering::SeqCst);
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10));
    assert_eq!(cache.metrics().invalidations(), 1);
}

#[test]
fn test_corrupt_entry_is_a_miss() {
    let cache = flaky_cache();
    let reads = Executions::default();
    reads.read(&cache, &select_car(10), "car 10");

    cache.store().backend().set(&entry_key(10), b"\xffgarbage", None).expect("set");

    assert_eq!(reads.read(&cache, &select_car(10), "car 10 again"), Payload::from("car 10 again"));
    assert_eq!(reads.count(), 2);

    // The corrupt entry was overwritten by the fresh result
    assert_eq!(reads.read(&cache, &select_car(10), "ignored"), Payload::from("car 10 again"));
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_malformed_statement_bypasses() {
    let cache = flaky_cache();
    let reads = Executions::default();
    let statement = select_car(10).kind_named("replace");

    reads.read(&cache, &statement, "car 10");
    reads.read(&cache, &statement, "car 10");
    assert_eq!(reads.count(), 2);
    assert!(cache.store().backend().inner().scan_prefix("").expect("scan").is_empty());
}

#[test]
fn test_executor_error_with_broken_store() {
    let cache = flaky_cache();
    cache.store().backend().fail_reads.store(true, Ordering::SeqCst);
    cache.store().backend().fail_writes.store(true, Ordering::SeqCst);

    let result: Result<Payload, &str> = cache.read(&select_car(10), || Err("timeout"));
    assert_eq!(result, Err("timeout"));
}
