use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::tempdir;

use crate::core::store::FirkinStore;
use crate::error::FirkinError;

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

#[test]
fn test_expired_key_reads_as_missing() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    store.set_with_expiration("k", b"v", now() - 1).unwrap();
    assert!(matches!(store.get("k"), Err(FirkinError::KeyNotFound)));

    let stats = store.stats();
    assert_eq!(stats.ttl_expired_reads, 1);
}

#[test]
fn test_future_expiration_still_readable() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    store.set_with_expiration("k", b"v", now() + 3600).unwrap();
    assert_eq!(store.get("k").unwrap(), b"v");
}

#[test]
fn test_zero_expiration_never_expires() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    store.set_with_expiration("k", b"v", 0).unwrap();
    assert_eq!(store.get("k").unwrap(), b"v");
}

#[test]
fn test_set_with_ttl() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    store.set_with_ttl("session", b"data", 3600).unwrap();
    assert_eq!(store.get("session").unwrap(), b"data");
}

#[test]
fn test_overwrite_clears_expiration() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    store.set_with_expiration("k", b"v1", now() - 1).unwrap();
    store.set("k", b"v2").unwrap();
    assert_eq!(store.get("k").unwrap(), b"v2");
}

#[test]
fn test_expired_key_still_listed_until_merge() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    store.set_with_expiration("k", b"v", now() - 1).unwrap();

    // The record is on disk and indexed; only reads check expiration
    assert_eq!(store.keys(), vec!["k".to_string()]);
}

#[test]
fn test_expiration_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = FirkinStore::open(dir.path()).unwrap();
        store.set_with_expiration("gone", b"v", now() - 10).unwrap();
        store.set_with_expiration("kept", b"v", now() + 3600).unwrap();
        store.close().unwrap();
    }

    let store = FirkinStore::open(dir.path()).unwrap();
    assert!(matches!(store.get("gone"), Err(FirkinError::KeyNotFound)));
    assert_eq!(store.get("kept").unwrap(), b"v");
}
