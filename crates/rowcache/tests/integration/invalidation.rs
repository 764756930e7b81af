//! Invalidation behavior across reads and writes.

use std::time::Duration;

use rowcache::{cache_key, reflect, CacheConfig, Tag};
use rowcache_core::{Payload, Statement, StatementKind, TableRef};
use rowcache_storage::KeyValueStore;

use super::common::{memory_cache, select_all_cars, select_car, write, write_cars, Executions};

fn update_driver(id: i64) -> Statement {
    Statement::new("shop").kind(StatementKind::Update).from_table("drivers").where_eq("id", id)
}

#[test]
fn test_row_isolation() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(11), "car 11");
    assert_eq!(reads.count(), 2);

    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11));

    // Row 10 is still cached, row 11 is not
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);
    reads.read(&cache, &select_car(11), "car 11 updated");
    assert_eq!(reads.count(), 3);
}

#[test]
fn test_specific_write_evicts_unspecific_reads() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_all_cars(), "all cars");
    reads.read(&cache, &select_car(10), "car 10");

    write(&cache, &write_cars(StatementKind::Delete).where_eq("id", 11));

    reads.read(&cache, &select_all_cars(), "all cars");
    assert_eq!(reads.count(), 3);
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 3);
}

#[test]
fn test_broad_write_completeness() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(11), "car 11");
    reads.read(&cache, &select_all_cars(), "all cars");

    // UPDATE cars SET name = 'ALL'
    write(&cache, &write_cars(StatementKind::Update));

    for statement in [select_car(10), select_car(11), select_all_cars()] {
        let key = cache_key(&reflect(&statement).expect("reflect"));
        assert!(!cache.store().has(&key).expect("has"));
    }
}

#[test]
fn test_truncate_completeness() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_all_cars(), "all cars");

    write(&cache, &write_cars(StatementKind::Truncate));

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_all_cars(), "all cars");
    assert_eq!(reads.count(), 4);
}

#[test]
fn test_insert_evicts_missing_row_read() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(12), "no such car");
    write(&cache, &write_cars(StatementKind::Insert));
    reads.read(&cache, &select_car(12), "car 12");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_primary_key_change_needs_unqualified_write() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(12), "no such car");

    // Narrowed to the old id, the update cannot reach row 12
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10));
    assert_eq!(reads.read(&cache, &select_car(12), "car 12"), Payload::from("no such car"));
    assert_eq!(reads.count(), 1);

    // Described as an unqualified write it reaches every row
    write(&cache, &write_cars(StatementKind::Update));
    assert_eq!(reads.read(&cache, &select_car(12), "car 12"), Payload::from("car 12"));
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_write_to_other_table_keeps_entries() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_all_cars(), "all cars");
    write(&cache, &Statement::new("shop").kind(StatementKind::Truncate).from_table("drivers"));
    write(&cache, &Statement::new("garage").kind(StatementKind::Truncate).from_table("cars"));

    reads.read(&cache, &select_all_cars(), "all cars");
    assert_eq!(reads.count(), 1);
}

#[test]
fn test_join_read_evicted_by_either_table() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let joined = Statement::new("shop")
        .from_table("cars as c")
        .join("drivers as d")
        .where_eq("c.id", 10)
        .sql("select * from cars c join drivers d on d.car_id = c.id where c.id = ?")
        .bind(10);

    reads.read(&cache, &joined, "joined");
    write(&cache, &update_driver(3));
    reads.read(&cache, &joined, "joined");
    assert_eq!(reads.count(), 2);

    // A write to another car leaves the read alone
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11));
    reads.read(&cache, &joined, "joined");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_union_and_exists_reads_evicted() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let union = select_all_cars()
        .union(Statement::new("shop").from_table("trucks"))
        .sql("select * from cars union select * from trucks");
    let exists = select_all_cars()
        .where_exists(Statement::new("shop").from_table("tickets").where_eq("car_id", 1))
        .sql("select * from cars where exists (select 1 from tickets where car_id = cars.id)");

    reads.read(&cache, &union, "union");
    reads.read(&cache, &exists, "exists");

    write(&cache, &Statement::new("shop").kind(StatementKind::Insert).from_table("trucks"));
    let delete_ticket =
        Statement::new("shop").kind(StatementKind::Delete).from_table("tickets").where_eq("id", 5);
    write(&cache, &delete_ticket);

    reads.read(&cache, &union, "union");
    reads.read(&cache, &exists, "exists");
    assert_eq!(reads.count(), 4);
}

#[test]
fn test_subquery_tag_propagation() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let drivers = Statement::new("shop").from_table("drivers").where_eq("id", 7);
    let statement = select_all_cars()
        .where_in_subquery("driver_id", drivers)
        .sql("select * from cars where driver_id in (select id from drivers where id = ?)")
        .bind(7);

    reads.read(&cache, &statement, "cars of driver 7");
    write(&cache, &update_driver(7));
    reads.read(&cache, &statement, "cars of driver 7");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_derived_table_read() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let inner = Statement::new("shop").from_table("cars").where_eq("id", 10);
    let statement = Statement::new("shop")
        .from_table(TableRef::subquery(inner, Some("sub")))
        .sql("select * from (select * from cars where id = 10) sub");

    reads.read(&cache, &statement, "derived");
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 99));
    reads.read(&cache, &statement, "derived");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_self_healing() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let statement = select_car(10);
    reads.read(&cache, &statement, "car 10");

    let key = cache_key(&reflect(&statement).expect("reflect"));
    let entry = format!("rowcache:{key}");
    let row_tag = format!("rowcache:{}", Tag::row("shop", "cars", "10"));
    let specific_tag = format!("rowcache:{}", Tag::table_specific("shop", "cars"));
    let backend = cache.store().backend();

    // Lose both memberships while the entry stays valid
    backend.srem(&row_tag, &entry).expect("srem");
    backend.srem(&specific_tag, &entry).expect("srem");

    reads.read(&cache, &statement, "car 10");
    assert_eq!(reads.count(), 1);
    assert_eq!(backend.smembers(&row_tag).expect("smembers"), vec![entry.clone()]);
    assert_eq!(backend.smembers(&specific_tag).expect("smembers"), vec![entry]);
    assert_eq!(cache.metrics().heals(), 2);

    // The healed membership makes the next write find the entry again
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 10));
    reads.read(&cache, &statement, "car 10 updated");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_rows_disabled_is_table_wide() {
    let cache = memory_cache(CacheConfig::new().consider_rows(false));
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    write(&cache, &write_cars(StatementKind::Update).where_eq("id", 11));
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);
    assert!(cache.store().backend().exists("rowcache:db:shop:cars").expect("exists"));
}

#[test]
fn test_manual_table_invalidation() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_all_cars(), "all cars");

    let removed = cache.invalidate_tables("shop", ["cars"]);
    assert_eq!(removed.len(), 2);
    assert_eq!(cache.metrics().invalidations(), 2);
}

#[test]
fn test_flush_clears_namespace() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    cache.store().backend().set("unrelated", b"1", None).expect("set");

    assert!(cache.flush().expect("flush") >= 3);
    assert!(cache.store().backend().scan_prefix("rowcache:").expect("scan").is_empty());
    assert!(cache.store().backend().exists("unrelated").expect("exists"));

    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_entries_expire() {
    let cache = memory_cache(CacheConfig::new().expiration_time(1));
    let reads = Executions::default();

    reads.read(&cache, &select_car(10), "car 10");
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 1);

    std::thread::sleep(Duration::from_millis(1100));
    reads.read(&cache, &select_car(10), "car 10");
    assert_eq!(reads.count(), 2);
}

#[test]
fn test_distinct_bindings_distinct_entries() {
    let cache = memory_cache(CacheConfig::default());
    let reads = Executions::default();
    let by_name = |name: &str| {
        Statement::new("shop")
            .from_table("cars")
            .where_eq("name", name)
            .sql("select * from cars where name = ?")
            .bind(name)
    };

    reads.read(&cache, &by_name("Volvo"), "volvo");
    reads.read(&cache, &by_name("Saab"), "saab");
    reads.read(&cache, &by_name("Volvo"), "volvo");
    assert_eq!(reads.count(), 2);
}
