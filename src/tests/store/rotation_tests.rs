use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::core::store::FirkinStore;
use crate::storage::paths::data_file_ids;

fn count_files(dir: &Path, extension: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|ext| ext == extension)
        })
        .count()
}

/// MaxFileSize 64 with 32-byte records: the size check trips on every
/// second append, so each segment holds exactly one record.
fn tiny_store(dir: &Path) -> FirkinStore {
    FirkinStore::builder()
        .max_file_size(64)
        .write_buffer_size(32)
        .open(dir)
        .unwrap()
}

#[test]
fn test_rotation_preserves_data() {
    let dir = tempdir().unwrap();
    let store = tiny_store(dir.path());

    // Header is 24 bytes; key (3) + value (5) makes each record 32 bytes
    for i in 0..10 {
        let key = format!("k{:02}", i);
        let value = format!("val{:02}", i);
        store.set(&key, value.as_bytes()).unwrap();
    }

    // Readable before and after the rotations settle
    for i in 0..10 {
        let key = format!("k{:02}", i);
        let value = format!("val{:02}", i);
        assert_eq!(store.get(&key).unwrap(), value.as_bytes());
    }

    assert!(count_files(dir.path(), "data") >= 4);
    store.close().unwrap();
}

#[test]
fn test_rotation_count_matches_files() {
    let dir = tempdir().unwrap();
    let store = tiny_store(dir.path());

    for i in 0..10 {
        store.set(&format!("k{:02}", i), b"12345").unwrap();
    }

    let rotations = store.stats().rotations;
    store.close().unwrap();

    // N rotations leave N+1 data files
    assert_eq!(count_files(dir.path(), "data") as u64, rotations + 1);
}

#[test]
fn test_sealed_segments_get_hint_files() {
    let dir = tempdir().unwrap();
    let store = tiny_store(dir.path());

    for i in 0..10 {
        store.set(&format!("k{:02}", i), b"12345").unwrap();
    }
    // Close joins the hint worker, so every queued hint file exists now
    store.close().unwrap();

    let mut ids = data_file_ids(dir.path()).unwrap();
    ids.sort();
    let active_id = *ids.last().unwrap();

    for id in &ids {
        let hint = dir.path().join(format!("{:08}.hint", id));
        if *id == active_id {
            assert!(!hint.exists(), "active segment must not have a hint");
        } else {
            assert!(hint.exists(), "sealed segment {} missing its hint", id);
        }
    }

    assert_eq!(count_files(dir.path(), "hint"), ids.len() - 1);
}

#[test]
fn test_file_ids_increase_without_reuse() {
    let dir = tempdir().unwrap();
    let store = tiny_store(dir.path());

    for i in 0..6 {
        store.set(&format!("k{:02}", i), b"12345").unwrap();
    }
    store.close().unwrap();

    let mut ids = data_file_ids(dir.path()).unwrap();
    ids.sort();
    let expected: Vec<u64> = (1..=ids.len() as u64).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_overwrites_across_rotations() {
    let dir = tempdir().unwrap();
    let store = tiny_store(dir.path());

    for i in 0..10 {
        let value = format!("val{:02}", i);
        store.set("k00", value.as_bytes()).unwrap();
    }
    assert_eq!(store.get("k00").unwrap(), b"val09");
}
