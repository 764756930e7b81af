//! Loading configuration from files.

use std::io::Write;
use std::time::Duration;

use rowcache::{CacheConfig, Error};
use rowcache_storage::KeyValueStore;
use tempfile::NamedTempFile;

use super::common::{memory_cache, select_car, Executions};

fn config_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(text.as_bytes()).expect("failed to write config");
    file
}

#[test]
fn test_load_from_file() {
    let file = config_file(
        r#"
        prefix = "app:cache:"
        expiration_time = 60
        consider_rows = false
        exclude_tables = ["sessions", "audit_log"]
        "#,
    );

    let config = CacheConfig::from_file(file.path()).expect("load");
    assert!(config.active);
    assert_eq!(config.prefix, "app:cache:");
    assert_eq!(config.ttl(), Some(Duration::from_secs(60)));
    assert!(!config.consider_rows);
    assert_eq!(config.exclude_tables, vec!["sessions".to_owned(), "audit_log".to_owned()]);
}

#[test]
fn test_loaded_prefix_namespaces_store() {
    let file = config_file("prefix = \"app:\"\n");
    let cache = memory_cache(CacheConfig::from_file(file.path()).expect("load"));
    Executions::default().read(&cache, &select_car(1), "car 1");

    let keys = cache.store().backend().scan_prefix("").expect("scan");
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|key| key.starts_with("app:")));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = CacheConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_invalid_file() {
    let file = config_file("expiration_time = \"soon\"\n");
    assert!(matches!(CacheConfig::from_file(file.path()), Err(Error::Config(_))));

    let file = config_file("include_tables = [\"cars\"]\nexclude_tables = [\"cars\"]\n");
    let err = CacheConfig::from_file(file.path()).expect_err("overlap must fail");
    assert!(err.to_string().contains("cars"));
}
