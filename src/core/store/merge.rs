use std::fs;
use std::io;
use std::sync::atomic::Ordering;

use crate::error::{FirkinError, Result};
use crate::storage::paths::{data_file_path, hint_file_path};

use super::{unix_now, FirkinStore};

impl FirkinStore {
    /// Reclaim space from sealed segments.
    ///
    /// Walks sealed segments in ascending fileId order and re-appends every
    /// record that is still the authoritative version of its key through
    /// the normal write path; tombstones and expired records are dropped
    /// from the directory instead. Each fully processed segment is deleted
    /// along with its hint file.
    ///
    /// Single-flight: a call that finds a merge already running returns
    /// `Ok(())` immediately. An error aborts the merge and leaves the
    /// failing segment (and everything after it) on disk for the next run.
    pub fn merge(&self) -> Result<()> {
        // Make sure only one merge is running.
        if self
            .merging
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let result = self.run_merge();
        self.merging.store(false, Ordering::Release);
        result
    }

    fn run_merge(&self) -> Result<()> {
        // Everything below the active segment observed here is sealed and
        // eligible. Segments sealed later are left for the next merge.
        let end = {
            let state = self.state.read();
            state
                .active
                .as_ref()
                .ok_or(FirkinError::ShuttingDown)?
                .file_id()
        };

        let mut file_id = self.min_file_id.load(Ordering::Acquire);
        while file_id < end {
            self.merge_segment(file_id)?;
            file_id += 1;
            // Advance only past segments that were actually reclaimed, so a
            // failed merge retries from the segment that is still on disk.
            self.min_file_id.store(file_id, Ordering::Release);
        }
        Ok(())
    }

    fn merge_segment(&self, file_id: u64) -> Result<()> {
        let path = data_file_path(&self.dir, file_id);
        let segment = self.cache.acquire(&path, file_id)?;

        let merge_start = unix_now();
        let mut rewritten = 0u64;
        let mut dropped = 0u64;

        segment.for_each_record(|record, file_id, offset| {
            // Sealed segments are never repaired in place; a bad checksum
            // aborts the merge with the segment intact.
            record.verify()?;
            let key =
                std::str::from_utf8(&record.key).map_err(|_| FirkinError::CorruptedRecord)?;

            let mut state = self.state.write();
            let Some(entry) = state.keydir.get(key) else {
                return Ok(());
            };
            if entry.file_id != file_id || entry.value_pos as u64 != offset {
                // A newer record owns this key.
                return Ok(());
            }

            if record.is_tombstone() || record.is_expired(merge_start) {
                state.keydir.delete(key);
                dropped += 1;
            } else {
                self.append_record(&mut state, record)?;
                rewritten += 1;
            }
            Ok(())
        })?;
        drop(segment);

        fs::remove_file(&path)?;
        match fs::remove_file(hint_file_path(&self.dir, file_id)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        self.stats.record_merged_segment(rewritten, dropped);
        Ok(())
    }
}
