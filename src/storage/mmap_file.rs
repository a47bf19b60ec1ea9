use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{FirkinError, Result};

/// Read-only file backed by a memory mapping of its entire content.
///
/// The size is fixed at construction; the mapping is released on drop.
/// Returned slices alias the mapping, so the borrow checker keeps them from
/// outliving the file.
#[derive(Debug)]
pub struct MmapFile {
    map: Option<Mmap>,
    len: u64,
}

impl MmapFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        // An empty file cannot be mapped; hold it unmapped instead.
        let map = if len > 0 {
            Some(unsafe { Mmap::map(&file)? })
        } else {
            None
        };

        Ok(Self { map, len })
    }

    /// Read `len` bytes starting at `offset`.
    ///
    /// An offset past the end of the file is a caller bug and reported as
    /// `InvalidOffset`. A range that starts inside the file but extends past
    /// its end signals `UnexpectedEof`; no caller consumes the truncated
    /// prefix, so none is returned.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        if offset > self.len {
            return Err(FirkinError::InvalidOffset);
        }

        if offset + len as u64 > self.len {
            return Err(FirkinError::UnexpectedEof);
        }

        let region = self.map.as_deref().unwrap_or(&[]);
        let start = offset as usize;
        Ok(&region[start..start + len])
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
