use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::cache::SegmentCache;
use crate::core::keydir::{KeyDir, KeyDirEntry};
use crate::error::{FirkinError, Result};
use crate::stats::Statistics;
use crate::storage::hint::HintReader;
use crate::storage::paths::{data_file_ids, data_file_path, hint_file_path};
use crate::storage::segment::ActiveSegment;

use super::hints::HintScribe;
use super::{FirkinStore, StoreConfig, StoreState};

impl FirkinStore {
    /// Open a store at `dir` with default configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use firkin::FirkinStore;
    ///
    /// # fn main() -> firkin::Result<()> {
    /// let store = FirkinStore::open("/path/to/db")?;
    /// store.set("key", b"value")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(dir.into(), StoreConfig::default())
    }

    pub(super) fn with_config(dir: PathBuf, config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&dir)?;

        let stats = Arc::new(Statistics::new());
        let cache = SegmentCache::new(config.max_open_files, Arc::clone(&stats));

        let store = Self {
            hints: HintScribe::start(dir.clone(), Arc::clone(&stats)),
            dir,
            config,
            state: RwLock::new(StoreState {
                keydir: KeyDir::new(),
                active_keydir: KeyDir::new(),
                active: None,
                max_file_id: 0,
            }),
            min_file_id: AtomicU64::new(0),
            cache,
            stats,
            merging: AtomicBool::new(false),
            read_only: AtomicBool::new(false),
        };

        store.scan()?;
        Ok(store)
    }

    /// Enumerate the directory, replay every segment into the key
    /// directory, and open the newest segment as the active one.
    fn scan(&self) -> Result<()> {
        let mut state = self.state.write();

        let mut min_id = 0u64;
        let mut max_id = 0u64;
        for file_id in data_file_ids(&self.dir)? {
            self.restore(&mut state, file_id)?;

            if min_id == 0 || file_id < min_id {
                min_id = file_id;
            }
            if max_id == 0 || file_id > max_id {
                max_id = file_id;
            }
        }

        // An empty directory starts at fileId 1.
        if max_id == 0 {
            min_id = 1;
            max_id = 1;
        }

        // Recovery may have opened the newest segment through the cache;
        // drop it from the list so the active file is not open twice.
        self.cache.evict(max_id);

        let path = data_file_path(&self.dir, max_id);
        state.active = Some(ActiveSegment::open(
            &path,
            max_id,
            self.config.write_buffer_size,
        )?);
        state.max_file_id = max_id;
        self.min_file_id.store(min_id, Ordering::Release);
        Ok(())
    }

    /// Rebuild directory entries for one segment, using its hint file when
    /// present and falling back to scanning the data file.
    fn restore(&self, state: &mut StoreState, file_id: u64) -> Result<()> {
        if hint_file_path(&self.dir, file_id).exists()
            && self.restore_from_hint(state, file_id).is_ok()
        {
            self.stats
                .segments_restored_from_hint
                .fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        self.restore_from_data(state, file_id)?;
        self.stats
            .segments_restored_from_data
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn restore_from_hint(&self, state: &mut StoreState, file_id: u64) -> Result<()> {
        let reader = HintReader::open(&hint_file_path(&self.dir, file_id))?;
        reader.for_each_item(|item| {
            let key =
                std::str::from_utf8(&item.key).map_err(|_| FirkinError::CorruptedRecord)?;

            if newer_than(state.keydir.get(key), file_id, item.value_pos) {
                state.keydir.set(
                    key,
                    KeyDirEntry {
                        file_id,
                        value_pos: item.value_pos,
                        value_size: item.value_size,
                        flag: item.flag,
                    },
                );
            }
            Ok(())
        })
    }

    fn restore_from_data(&self, state: &mut StoreState, file_id: u64) -> Result<()> {
        let path = data_file_path(&self.dir, file_id);
        let segment = self.cache.acquire(&path, file_id)?;
        segment.for_each_record(|record, file_id, offset| {
            let key =
                std::str::from_utf8(&record.key).map_err(|_| FirkinError::CorruptedRecord)?;

            if newer_than(state.keydir.get(key), file_id, offset as u32) {
                state.keydir.set(
                    key,
                    KeyDirEntry {
                        file_id,
                        value_pos: offset as u32,
                        value_size: record.value.len() as u32,
                        flag: record.flag,
                    },
                );
            }
            Ok(())
        })
    }
}

/// Replay rule: a record wins when the key is new, comes from a newer
/// segment, or sits later in the same segment.
fn newer_than(existing: Option<KeyDirEntry>, file_id: u64, value_pos: u32) -> bool {
    match existing {
        None => true,
        Some(entry) => {
            file_id > entry.file_id || (file_id == entry.file_id && value_pos > entry.value_pos)
        }
    }
}
