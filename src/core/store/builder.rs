use std::path::PathBuf;

use crate::constants::*;
use crate::error::Result;

use super::FirkinStore;

/// Configuration options for FirkinStore.
///
/// Use `StoreBuilder` for a more ergonomic way to configure the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Append buffer size of the active segment, in bytes.
    pub write_buffer_size: usize,
    /// Soft size threshold at which the active segment is sealed and a new
    /// one opened.
    pub max_file_size: u64,
    /// Capacity of the open sealed-segment cache.
    pub max_open_files: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        }
    }
}

/// Builder for creating FirkinStore with custom configuration.
///
/// # Example
///
/// ```no_run
/// use firkin::FirkinStore;
///
/// # fn main() -> firkin::Result<()> {
/// let store = FirkinStore::builder()
///     .write_buffer_size(1024 * 1024)
///     .max_file_size(64 * 1024 * 1024)
///     .max_open_files(256)
///     .open("/path/to/db")?;
/// # Ok(())
/// # }
/// ```
pub struct StoreBuilder {
    config: StoreConfig,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    /// Set the active-segment append buffer size in bytes.
    ///
    /// Recent appends sit in this buffer until it fills; reads still see
    /// them. Default: 4 MiB.
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.write_buffer_size = size;
        self
    }

    /// Set the segment rotation threshold in bytes.
    ///
    /// An append that would push the active segment to or past this size
    /// seals it first. Default: 32 MiB.
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// Set how many sealed segments may be held open at once.
    ///
    /// Clamped to at least 1. Default: 1000.
    pub fn max_open_files(mut self, count: usize) -> Self {
        self.config.max_open_files = count.max(1);
        self
    }

    /// Open the store at `dir`, creating the directory if needed and
    /// recovering any existing segments.
    pub fn open(self, dir: impl Into<PathBuf>) -> Result<FirkinStore> {
        FirkinStore::with_config(dir.into(), self.config)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
