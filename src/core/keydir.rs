use std::collections::HashMap;

use ahash::RandomState;

use crate::constants::FLAG_TOMBSTONE;

/// Where the most recent record of a key lives: segment, offset, value size
/// and the record's flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDirEntry {
    pub file_id: u64,
    pub value_pos: u32,
    pub value_size: u32,
    pub flag: u32,
}

impl KeyDirEntry {
    pub fn is_tombstone(&self) -> bool {
        self.flag & FLAG_TOMBSTONE != 0
    }
}

/// In-memory mapping from key to the location of its most recent record.
///
/// Entries are plain `Copy` values, so lookups hand out copies and callers
/// never observe later mutations.
#[derive(Debug, Default)]
pub struct KeyDir {
    map: HashMap<String, KeyDirEntry, RandomState>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<KeyDirEntry> {
        self.map.get(key).copied()
    }

    pub fn set(&mut self, key: &str, entry: KeyDirEntry) {
        self.map.insert(key.to_owned(), entry);
    }

    pub fn delete(&mut self, key: &str) {
        self.map.remove(key);
    }

    /// Keys whose current entry is not a tombstone, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.map
            .iter()
            .filter(|(_, entry)| entry.flag & FLAG_TOMBSTONE == 0)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyDirEntry)> {
        self.map.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
