use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use bytes::Bytes;

use crate::constants::HINT_HEADER_SIZE;
use crate::error::{FirkinError, Result};
use crate::storage::mmap_file::MmapFile;

/// One entry of a hint file: the key and where its record lives in the
/// companion data file. Hint files carry no checksum; they are a derivable
/// index and recovery falls back to the data file when one is damaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintItem {
    pub flag: u32,
    pub expiration: i64,
    pub value_size: u32,
    pub value_pos: u32,
    pub key: Bytes,
}

impl HintItem {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HINT_HEADER_SIZE + self.key.len());
        buf.extend_from_slice(&self.flag.to_le_bytes());
        buf.extend_from_slice(&(self.expiration as u64).to_le_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value_size.to_le_bytes());
        buf.extend_from_slice(&self.value_pos.to_le_bytes());
        buf.extend_from_slice(&self.key);
        buf
    }

    /// Encoded size of the item: header plus key.
    pub fn size(&self) -> u64 {
        (HINT_HEADER_SIZE + self.key.len()) as u64
    }
}

/// Sequential reader over a hint file.
#[derive(Debug)]
pub struct HintReader {
    file: MmapFile,
}

impl HintReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            file: MmapFile::open(path)?,
        })
    }

    /// Run `f` on every item in the file. End-of-data ends the iteration
    /// cleanly; callback errors abort it.
    pub fn for_each_item<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&HintItem) -> Result<()>,
    {
        let mut offset = 0u64;
        loop {
            let item = match self.read_item_at(offset) {
                Ok(item) => item,
                Err(FirkinError::UnexpectedEof) => break,
                Err(e) => return Err(e),
            };
            f(&item)?;
            offset += item.size();
        }
        Ok(())
    }

    fn read_item_at(&self, offset: u64) -> Result<HintItem> {
        let buf = self.file.read_at(offset, HINT_HEADER_SIZE)?;

        let flag = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let expiration = u64::from_le_bytes(buf[4..12].try_into().unwrap()) as i64;
        let key_size = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let value_size = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let value_pos = u32::from_le_bytes(buf[20..24].try_into().unwrap());

        let key = self
            .file
            .read_at(offset + HINT_HEADER_SIZE as u64, key_size as usize)?;

        Ok(HintItem {
            flag,
            expiration,
            value_size,
            value_pos,
            key: Bytes::copy_from_slice(key),
        })
    }
}

/// Buffered appender used to generate a hint file for a sealed segment.
#[derive(Debug)]
pub struct HintWriter {
    writer: BufWriter<File>,
}

impl HintWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, item: &HintItem) -> Result<()> {
        self.writer.write_all(&item.encode())?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
