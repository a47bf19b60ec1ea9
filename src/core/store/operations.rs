use std::sync::atomic::Ordering;
use std::time::Instant;

use bytes::Bytes;

use crate::constants::*;
use crate::core::keydir::KeyDirEntry;
use crate::core::record::Record;
use crate::error::{FirkinError, Result};
use crate::storage::paths::data_file_path;
use crate::storage::segment::ActiveSegment;

use super::hints::HintJob;
use super::{unix_now, FirkinStore, StoreState};

impl FirkinStore {
    /// Retrieve the value stored under `key`.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` - key absent, deleted, or expired
    /// * `CorruptedRecord` - checksum or key mismatch at the indexed offset
    /// * `IoError` - failed to read the owning segment
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use firkin::FirkinStore;
    /// # fn main() -> firkin::Result<()> {
    /// # let store = FirkinStore::open("/path/to/db")?;
    /// store.set("key", b"value")?;
    /// let value = store.get("key")?;
    /// assert_eq!(value, b"value");
    /// # Ok(())
    /// # }
    /// ```
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let result = self.get_inner(key);
        match &result {
            Ok(_) => self.stats.record_get(start.elapsed().as_nanos() as u64),
            Err(e) => self.stats.record_error(e),
        }
        result
    }

    fn get_inner(&self, key: &str) -> Result<Vec<u8>> {
        let state = self.state.read();

        let entry = match state.keydir.get(key) {
            Some(entry) if !entry.is_tombstone() => entry,
            _ => return Err(FirkinError::KeyNotFound),
        };
        let active = state.active.as_ref().ok_or(FirkinError::ShuttingDown)?;

        let record = if entry.file_id == active.file_id() {
            // Data still in the active segment; it is only mutated under
            // the exclusive lock, so the shared lock covers this read.
            active.read_record_at(entry.value_pos as u64)?
        } else {
            // Pin the sealed segment, then release the engine lock before
            // the read: the segment is immutable and the pin keeps it open.
            let path = data_file_path(&self.dir, entry.file_id);
            let segment = self.cache.acquire(&path, entry.file_id);
            drop(state);
            segment?.read_record_at(entry.value_pos as u64)?
        };

        if record.key != key.as_bytes() {
            return Err(FirkinError::CorruptedRecord);
        }
        if record.is_expired(unix_now()) {
            self.stats.ttl_expired_reads.fetch_add(1, Ordering::Relaxed);
            return Err(FirkinError::KeyNotFound);
        }

        Ok(record.value.to_vec())
    }

    /// Store `value` under `key` with no expiration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use firkin::FirkinStore;
    /// # fn main() -> firkin::Result<()> {
    /// # let store = FirkinStore::open("/path/to/db")?;
    /// store.set("user:123", b"{\"name\":\"sam\"}")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.set_with_expiration(key, value, 0)
    }

    /// Store `value` under `key`, expiring at `expiration` seconds since
    /// the epoch. An expiration of 0 means the record never expires; once
    /// the wall clock passes a positive expiration, reads report the key
    /// as not found.
    pub fn set_with_expiration(&self, key: &str, value: &[u8], expiration: i64) -> Result<()> {
        let start = Instant::now();
        self.validate_key_value(key, value)?;

        let record = Record::with_expiration(
            Bytes::copy_from_slice(key.as_bytes()),
            Bytes::copy_from_slice(value),
            expiration,
        );
        let size = record.size();

        let mut state = self.state.write();
        self.append_record(&mut state, &record)?;
        drop(state);

        self.stats.record_set(start.elapsed().as_nanos() as u64, size);
        Ok(())
    }

    /// Store `value` under `key`, expiring `ttl_secs` seconds from now.
    pub fn set_with_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
        self.set_with_expiration(key, value, unix_now() + ttl_secs as i64)
    }

    /// Delete `key` by appending a tombstone.
    ///
    /// Deleting an absent key succeeds; the tombstone is reclaimed by the
    /// next merge either way.
    pub fn delete(&self, key: &str) -> Result<()> {
        let start = Instant::now();
        self.validate_key(key)?;

        let record = Record::tombstone(Bytes::copy_from_slice(key.as_bytes()));

        let mut state = self.state.write();
        self.append_record(&mut state, &record)?;
        drop(state);

        self.stats.record_delete(start.elapsed().as_nanos() as u64);
        Ok(())
    }

    /// Snapshot of all live keys, in no particular order.
    ///
    /// Keys whose records have expired but not yet been merged away still
    /// appear; reading them reports `KeyNotFound`.
    pub fn keys(&self) -> Vec<String> {
        self.state.read().keydir.keys()
    }

    /// Flush the active segment's buffer and fsync it.
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.write();
        let active = state.active.as_mut().ok_or(FirkinError::ShuttingDown)?;
        active.sync()
    }

    /// Close the store: flush the active segment, drop cached segments and
    /// wait for outstanding hint generation. Idempotent; also runs on drop.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        let active = state.active.take();
        drop(state);

        let result = match active {
            Some(mut segment) => segment.close(),
            None => Ok(()),
        };

        self.cache.close();
        self.hints.join();
        result
    }

    /// Append a record to the active segment, rotating first if it would
    /// reach the size threshold, and point both directories at it.
    /// Requires the exclusive lock, held by the caller via `state`.
    pub(super) fn append_record(&self, state: &mut StoreState, record: &Record) -> Result<()> {
        if self.read_only.load(Ordering::Acquire) {
            return Err(FirkinError::ReadOnly);
        }

        let needs_rotation = {
            let active = state.active.as_ref().ok_or(FirkinError::ShuttingDown)?;
            active.size() + record.size() >= self.config.max_file_size
        };
        if needs_rotation {
            self.rotate(state)?;
        }

        let active = state.active.as_mut().ok_or(FirkinError::ShuttingDown)?;
        let offset = match active.write_record(record) {
            Ok(offset) => offset,
            Err(e) => {
                // The segment tail is in an unknown state; refuse further
                // writes so the directory stays consistent with disk.
                self.read_only.store(true, Ordering::Release);
                return Err(e);
            }
        };

        let entry = KeyDirEntry {
            file_id: active.file_id(),
            value_pos: offset as u32,
            value_size: record.value.len() as u32,
            flag: record.flag,
        };
        let key = std::str::from_utf8(&record.key).map_err(|_| FirkinError::CorruptedRecord)?;
        state.keydir.set(key, entry);
        state.active_keydir.set(key, entry);
        Ok(())
    }

    /// Seal the active segment and open the next one. Hint generation for
    /// the sealed segment is handed to the worker; nothing waits for it
    /// here. Requires the exclusive lock.
    fn rotate(&self, state: &mut StoreState) -> Result<()> {
        let mut sealed = state.active.take().ok_or(FirkinError::ShuttingDown)?;

        let entries = std::mem::take(&mut state.active_keydir);
        self.hints.submit(HintJob {
            file_id: sealed.file_id(),
            entries,
        });

        sealed.close()?;

        state.max_file_id += 1;
        let path = data_file_path(&self.dir, state.max_file_id);
        state.active = Some(ActiveSegment::open(
            &path,
            state.max_file_id,
            self.config.write_buffer_size,
        )?);

        self.stats.record_rotation();
        Ok(())
    }

    fn validate_key(&self, key: &str) -> Result<()> {
        if key.is_empty() || key.len() > MAX_KEY_SIZE {
            return Err(FirkinError::InvalidKeySize);
        }
        Ok(())
    }

    fn validate_key_value(&self, key: &str, value: &[u8]) -> Result<()> {
        self.validate_key(key)?;
        if value.len() > MAX_VALUE_SIZE {
            return Err(FirkinError::InvalidValueSize);
        }
        Ok(())
    }
}
