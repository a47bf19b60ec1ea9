use std::fs;

use tempfile::tempdir;

use crate::core::store::FirkinStore;
use crate::error::FirkinError;
use crate::storage::paths::data_file_ids;

#[test]
fn test_reopen_round_trip() {
    let dir = tempdir().unwrap();
    {
        let store = FirkinStore::open(dir.path()).unwrap();
        store.set("a", b"1").unwrap();
        store.set("b", b"2").unwrap();
        store.set("a", b"1-updated").unwrap();
        store.delete("b").unwrap();
        store.set("c", b"3").unwrap();
        store.close().unwrap();
    }

    let store = FirkinStore::open(dir.path()).unwrap();
    assert_eq!(store.get("a").unwrap(), b"1-updated");
    assert!(matches!(store.get("b"), Err(FirkinError::KeyNotFound)));
    assert_eq!(store.get("c").unwrap(), b"3");

    let mut keys = store.keys();
    keys.sort();
    assert_eq!(keys, vec!["a", "c"]);
}

#[test]
fn test_reopen_after_rotations() {
    let dir = tempdir().unwrap();
    {
        let store = FirkinStore::builder()
            .max_file_size(64)
            .write_buffer_size(32)
            .open(dir.path())
            .unwrap();
        for i in 0..10 {
            let key = format!("k{:02}", i);
            let value = format!("val{:02}", i);
            store.set(&key, value.as_bytes()).unwrap();
        }
        store.close().unwrap();
    }

    let store = FirkinStore::open(dir.path()).unwrap();
    for i in 0..10 {
        let key = format!("k{:02}", i);
        let value = format!("val{:02}", i);
        assert_eq!(store.get(&key).unwrap(), value.as_bytes());
    }

    // Sealed segments recovered through their hint files
    assert!(store.stats().segments_restored_from_hint > 0);
}

#[test]
fn test_recovery_without_hint_files() {
    let dir = tempdir().unwrap();
    {
        let store = FirkinStore::builder()
            .max_file_size(64)
            .write_buffer_size(32)
            .open(dir.path())
            .unwrap();
        for i in 0..6 {
            store
                .set(&format!("k{:02}", i), format!("val{:02}", i).as_bytes())
                .unwrap();
        }
        store.close().unwrap();
    }

    // Drop every hint; recovery must fall back to scanning data files
    for entry in fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "hint") {
            fs::remove_file(path).unwrap();
        }
    }

    let store = FirkinStore::open(dir.path()).unwrap();
    for i in 0..6 {
        assert_eq!(
            store.get(&format!("k{:02}", i)).unwrap(),
            format!("val{:02}", i).as_bytes()
        );
    }
    assert_eq!(store.stats().segments_restored_from_hint, 0);
    assert!(store.stats().segments_restored_from_data > 0);
}

#[test]
fn test_tombstone_recovered_from_hint_file() {
    let dir = tempdir().unwrap();
    {
        let store = FirkinStore::builder()
            .max_file_size(64)
            .write_buffer_size(32)
            .open(dir.path())
            .unwrap();
        store.set("k00", b"12345").unwrap();
        store.delete("k00").unwrap();
        // Push the tombstone's segment out of the active slot
        for i in 1..4 {
            store.set(&format!("k{:02}", i), b"12345").unwrap();
        }
        store.close().unwrap();
    }

    let store = FirkinStore::open(dir.path()).unwrap();
    assert!(store.stats().segments_restored_from_hint > 0);
    assert!(matches!(store.get("k00"), Err(FirkinError::KeyNotFound)));
    assert!(!store.keys().contains(&"k00".to_string()));
}

#[test]
fn test_truncated_tail_record_is_dropped() {
    let dir = tempdir().unwrap();
    {
        let store = FirkinStore::open(dir.path()).unwrap();
        store.set("a", b"alpha").unwrap();
        store.set("b", b"beta").unwrap();
        store.set("c", b"gamma").unwrap();
        store.close().unwrap();
    }

    // Cut into the middle of the last record, as a crash mid-append would
    let path = dir.path().join("00000001.data");
    let len = fs::metadata(&path).unwrap().len();
    let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 3).unwrap();

    let store = FirkinStore::open(dir.path()).unwrap();
    assert_eq!(store.get("a").unwrap(), b"alpha");
    assert_eq!(store.get("b").unwrap(), b"beta");
    assert!(matches!(store.get("c"), Err(FirkinError::KeyNotFound)));
}

#[test]
fn test_open_empty_directory() {
    let dir = tempdir().unwrap();
    let store = FirkinStore::open(dir.path()).unwrap();

    assert!(store.keys().is_empty());
    assert!(matches!(store.get("k"), Err(FirkinError::KeyNotFound)));
    assert_eq!(store.min_file_id(), 1);
    store.set("k", b"v").unwrap();
    store.close().unwrap();

    assert_eq!(data_file_ids(dir.path()).unwrap(), vec![1]);
}

#[test]
fn test_open_creates_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("does/not/exist");

    let store = FirkinStore::open(&nested).unwrap();
    store.set("k", b"v").unwrap();
    assert_eq!(store.get("k").unwrap(), b"v");
}

#[test]
fn test_repeated_reopen_is_stable() {
    let dir = tempdir().unwrap();
    for round in 0..3 {
        let store = FirkinStore::open(dir.path()).unwrap();
        store
            .set("counter", format!("round-{}", round).as_bytes())
            .unwrap();
        store.close().unwrap();
    }

    let store = FirkinStore::open(dir.path()).unwrap();
    assert_eq!(store.get("counter").unwrap(), b"round-2");
}
