//! Admission through the global switch and the table lists.

use rowcache::CacheConfig;
use rowcache_core::{Statement, StatementKind};
use rowcache_storage::KeyValueStore;

use super::common::{memory_cache, select_all_cars, select_car, write, write_cars, Executions};

fn select_drivers() -> Statement {
    Statement::new("shop").from_table("drivers").sql("select * from drivers")
}

#[test]
fn test_inactive_cache_always_executes() {
    let cache = memory_cache(CacheConfig::disabled());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);
    assert_eq!(cache.metrics().bypasses(), 2);
    assert!(cache.store().backend().scan_prefix("").expect("scan").is_empty());

    // Writes leave the store alone too
    write(&cache, &write_cars(StatementKind::Truncate));
    assert_eq!(cache.metrics().invalidations(), 0);
}

#[test]
fn test_excluded_table_not_cached() {
    let cache = memory_cache(CacheConfig::new().exclude_tables(["drivers"]));
    let reads = Executions::default();

    reads.read(&cache, &select_drivers(), "drivers");
    reads.read(&cache, &select_drivers(), "drivers");
    assert_eq!(reads.count(), 2);

    reads.read(&cache, &select_all_cars(), "cars");
    reads.read(&cache, &select_all_cars(), "cars");
    assert_eq!(reads.count(), 3);
}

#[test]
fn test_excluded_table_in_join_not_cached() {
    let cache = memory_cache(CacheConfig::new().exclude_tables(["drivers"]));
    let reads = Executions::default();
    let joined = select_all_cars()
        .join("drivers")
        .sql("select * from cars join drivers on drivers.car_id = cars.id");

    reads.read(&cache, &joined, "joined");
    reads.read(&cache, &joined, "joined");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_excluded_table_in_subquery_not_cached() {
    let cache = memory_cache(CacheConfig::new().exclude_tables(["drivers"]));
    let reads = Executions::default();
    let statement = select_all_cars()
        .where_in_subquery("driver_id", Statement::new("shop").from_table("drivers"))
        .sql("select * from cars where driver_id in (select id from drivers)");

    reads.read(&cache, &statement, "cars");
    reads.read(&cache, &statement, "cars");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_include_list_limits_caching() {
    let cache = memory_cache(CacheConfig::new().include_tables(["cars"]));
    let reads = Executions::default();

    reads.read(&cache, &select_all_cars(), "cars");
    reads.read(&cache, &select_all_cars(), "cars");
    reads.read(&cache, &select_drivers(), "drivers");
    reads.read(&cache, &select_drivers(), "drivers");
    assert_eq!(reads.count(), 3);
}

#[test]
fn test_write_to_excluded_table_skips_invalidation() {
    let cache = memory_cache(CacheConfig::new().exclude_tables(["drivers"]));
    let reads = Executions::default();

    reads.read(&cache, &select_all_cars(), "cars");
    write(&cache, &Statement::new("shop").kind(StatementKind::Truncate).from_table("drivers"));
    assert_eq!(cache.metrics().bypasses(), 1);

    reads.read(&cache, &select_all_cars(), "cars");
    assert_eq!(reads.count(), 1);
}

#[test]
fn test_write_touching_admitted_and_excluded_tables() {
    let cache = memory_cache(CacheConfig::new().exclude_tables(["drivers"]));
    let reads = Executions::default();

    reads.read(&cache, &select_all_cars(), "cars");

    // DELETE cars USING drivers ...: only the admitted table is invalidated
    let delete = write_cars(StatementKind::Delete).join("drivers").where_eq("drivers.id", 3);
    write(&cache, &delete);

    reads.read(&cache, &select_all_cars(), "cars");
    assert_eq!(reads.count(), 2);
    assert!(!cache
        .store()
        .backend()
        .exists("rowcache:db:shop:table_unspecific:drivers")
        .expect("exists"));
}
