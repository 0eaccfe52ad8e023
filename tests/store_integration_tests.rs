//! Integration Tests for the Cache Store
//!
//! Drives the public API against real backing files in temporary directories.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use nano_cache::persist::{cache_file_path, hash_name};
use nano_cache::{CacheConfig, CacheError, CacheFormat, CacheStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// == Helper Functions ==

fn config_in(dir: &Path) -> CacheConfig {
    let mut config = CacheConfig::new("integration", dir);
    config.default_ttl = 60;
    config
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u32,
    name: String,
}

// == Get-or-compute ==

#[test]
fn test_end_to_end_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CacheStore::open(config_in(dir.path())).unwrap();
    let calls = Cell::new(0);

    let value = store
        .resolve_with(
            "user:1",
            || {
                calls.set(calls.get() + 1);
                json!({"name": "Ada"})
            },
            60,
            false,
        )
        .unwrap();
    assert_eq!(value, Some(json!({"name": "Ada"})));
    assert_eq!(calls.get(), 1);
    assert!(store.file_path().exists());

    let stale_calls = Cell::new(0);
    let value = store
        .resolve_with(
            "user:1",
            || {
                stale_calls.set(stale_calls.get() + 1);
                json!({"name": "CHANGED"})
            },
            60,
            false,
        )
        .unwrap();
    assert_eq!(value, Some(json!({"name": "Ada"})));
    assert_eq!(stale_calls.get(), 0);
}

#[test]
fn test_typed_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let ada = User {
        id: 1,
        name: "Ada".to_string(),
    };

    {
        let mut store = CacheStore::open(config_in(dir.path())).unwrap();
        let value = store.resolve("user:1", || ada.clone()).unwrap();
        assert_eq!(value.as_ref(), Some(&ada));
    }

    let mut store = CacheStore::open(config_in(dir.path())).unwrap();
    let value: Option<User> = store
        .resolve("user:1", || -> User { panic!("fresh record should be served from disk") })
        .unwrap();
    assert_eq!(value, Some(ada));
}

#[test]
fn test_ttl_expiry_triggers_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CacheStore::open(config_in(dir.path())).unwrap();

    store.resolve_with("counter", || 1u32, 1, false).unwrap();
    sleep(Duration::from_millis(2100));

    assert!(store.is_expired("counter"));
    let value = store.resolve_with("counter", || 2u32, 60, false).unwrap();
    assert_eq!(value, Some(2));
}

// == Eviction ==

#[test]
fn test_eviction_scenario_with_lock() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.delete_expired = false;
    let mut store = CacheStore::open(config).unwrap();

    store.insert("a", &json!("A"), 1, false).unwrap();
    store.insert("b", &json!("B"), 1, true).unwrap();
    sleep(Duration::from_millis(2100));

    assert_eq!(store.evict_expired().unwrap(), 1);
    assert!(!store.has_entry("a"));
    assert!(store.has_entry("b"));
}

#[test]
fn test_zero_ttl_is_expired_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.delete_expired = false;
    let mut store = CacheStore::open(config).unwrap();

    store.insert("flash", &json!("x"), 0, false).unwrap();
    assert!(store.is_expired("flash"));
}

// == Persistence ==

#[test]
fn test_backing_file_name_is_hashed() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CacheStore::open(config_in(dir.path())).unwrap();
    store.insert("k", &1, 60, false).unwrap();

    let expected = dir.path().join(format!("{}.json", hash_name("integration")));
    assert_eq!(store.file_path(), expected.as_path());
    assert!(expected.exists());
}

#[test]
fn test_tampered_file_is_deleted_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = {
        let mut store = CacheStore::open(config_in(dir.path())).unwrap();
        store.insert("k", &json!({"a": 1}), 60, false).unwrap();
        store.file_path().to_path_buf()
    };

    let tampered = fs::read_to_string(&path)
        .unwrap()
        .replace("\"expire\":60", "\"expire\":99");
    fs::write(&path, tampered).unwrap();

    let result = CacheStore::open(config_in(dir.path()));
    assert!(matches!(result, Err(CacheError::CorruptFile { .. })));
    assert!(!path.exists());

    let store = CacheStore::open(config_in(dir.path())).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_php_flavor_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.format = CacheFormat::Php;

    {
        let mut store = CacheStore::open(config.clone()).unwrap();
        store.insert("page", &json!({"row": {"id": 3}}), 60, false).unwrap();
    }

    let raw = fs::read_to_string(cache_file_path(dir.path(), "integration", CacheFormat::Php)).unwrap();
    let first_line = raw.lines().next().unwrap();
    assert!(first_line.contains("Access denied"));

    let mut store = CacheStore::open(config).unwrap();
    store
        .refresh("page", || -> Value { panic!("should be cached") })
        .unwrap();
    assert_eq!(store.row(), json!({"id": 3}));
}

#[test]
fn test_insecure_php_flavor_has_no_preamble() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.format = CacheFormat::Php;
    config.secure_access = false;

    let mut store = CacheStore::open(config).unwrap();
    store.insert("k", &1, 60, false).unwrap();

    let raw = fs::read_to_string(store.file_path()).unwrap();
    assert!(raw.starts_with('{'));
}

#[test]
fn test_plain_payloads_when_base64_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.base64 = false;

    let mut store = CacheStore::open(config).unwrap();
    store.insert("k", &json!({"name": "Ada"}), 60, false).unwrap();

    let raw = fs::read_to_string(store.file_path()).unwrap();
    assert!(raw.contains(r#"{\"name\":\"Ada\"}"#));
}

// == File Management ==

#[test]
fn test_remove_files_bulk() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["one", "two", "three"] {
        let mut config = config_in(dir.path());
        config.name = name.to_string();
        let mut store = CacheStore::open(config).unwrap();
        store.insert("k", &1, 60, false).unwrap();
    }

    assert!(CacheStore::remove_files(dir.path(), &["one", "two", "missing"], CacheFormat::Json));
    assert!(!cache_file_path(dir.path(), "one", CacheFormat::Json).exists());
    assert!(!cache_file_path(dir.path(), "two", CacheFormat::Json).exists());
    assert!(cache_file_path(dir.path(), "three", CacheFormat::Json).exists());
}

#[test]
fn test_clear_persists_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = CacheStore::open(config_in(dir.path())).unwrap();
        store.insert("k", &1, 60, true).unwrap();
        store.clear().unwrap();
    }

    let store = CacheStore::open(config_in(dir.path())).unwrap();
    assert!(store.is_empty());
    assert!(store.file_path().exists());
}
