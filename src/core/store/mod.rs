use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::core::cache::SegmentCache;
use crate::core::keydir::KeyDir;
use crate::stats::{Statistics, StatsSnapshot};
use crate::storage::segment::ActiveSegment;

// Re-export public types
pub use self::builder::{StoreBuilder, StoreConfig};

// Module declarations
pub mod builder;
mod hints;
mod init;
mod merge;
mod operations;

/// Log-structured, hash-indexed key-value store.
///
/// All mutations append to the active segment; an in-memory key directory
/// maps every live key to the segment and offset of its most recent record.
/// Reads resolve through the directory, sealed segments are served through
/// a reference-counted cache of memory mappings, and a background merge
/// reclaims space from overwritten and deleted records.
///
/// # Thread Safety
///
/// All methods take `&self` and are safe to call concurrently: one
/// reader-writer lock protects the directory and the active segment, and
/// merge runs single-flight alongside readers and writers.
pub struct FirkinStore {
    dir: PathBuf,
    config: StoreConfig,

    // Key directory, active-side directory and active segment, guarded
    // together with the current max fileId
    state: RwLock<StoreState>,

    // Smallest fileId still on disk; advanced only by merge
    min_file_id: AtomicU64,

    // Open sealed segments
    cache: SegmentCache,

    // Central statistics hub
    stats: Arc<Statistics>,

    // Single-flight flag for merge
    merging: AtomicBool,

    // Set after a failed append; all further writes are refused
    read_only: AtomicBool,

    // Background hint-file generation
    hints: hints::HintScribe,
}

pub(super) struct StoreState {
    pub(super) keydir: KeyDir,
    /// Entries written to the current active segment only; handed to the
    /// hint worker when the segment is sealed.
    pub(super) active_keydir: KeyDir,
    /// `None` once the store has been closed.
    pub(super) active: Option<ActiveSegment>,
    pub(super) max_file_id: u64,
}

impl FirkinStore {
    /// Create a builder for configuring FirkinStore.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use firkin::FirkinStore;
    ///
    /// # fn main() -> firkin::Result<()> {
    /// let store = FirkinStore::builder()
    ///     .max_file_size(64 * 1024 * 1024)
    ///     .open("/path/to/db")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    // ============ Utility Methods ============

    /// Check if a key exists and is not deleted
    pub fn contains_key(&self, key: &str) -> bool {
        self.state
            .read()
            .keydir
            .get(key)
            .is_some_and(|entry| !entry.is_tombstone())
    }

    /// Smallest fileId still on disk
    pub fn min_file_id(&self) -> u64 {
        self.min_file_id.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Get statistics snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for FirkinStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Wall-clock seconds since the epoch.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
