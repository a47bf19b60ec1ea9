use std::path::Path;

use bytes::Bytes;

use crate::constants::{MAX_KEY_SIZE, MAX_VALUE_SIZE, RECORD_HEADER_SIZE};
use crate::core::record::{Record, RecordHeader};
use crate::error::{FirkinError, Result};
use crate::storage::append_file::AppendFile;
use crate::storage::mmap_file::MmapFile;

/// The single writable segment, receiving all current appends.
///
/// Wraps a buffered append file, so the most recent records may still be in
/// memory; reads resolve through the same buffer.
#[derive(Debug)]
pub struct ActiveSegment {
    file: AppendFile,
    file_id: u64,
}

impl ActiveSegment {
    pub fn open(path: &Path, file_id: u64, write_buffer_size: usize) -> Result<Self> {
        Ok(Self {
            file: AppendFile::open(path, write_buffer_size)?,
            file_id,
        })
    }

    /// Append a record and return its starting offset.
    pub fn write_record(&mut self, record: &Record) -> Result<u64> {
        if record.key.len() > MAX_KEY_SIZE {
            return Err(FirkinError::InvalidKeySize);
        }
        if record.value.len() > MAX_VALUE_SIZE {
            return Err(FirkinError::InvalidValueSize);
        }

        let header = record.encode_header();
        let offset = self.file.size();
        self.file.write(&header)?;
        self.file.write(&record.key)?;
        self.file.write(&record.value)?;
        Ok(offset)
    }

    /// Read and checksum-verify the record starting at `offset`.
    pub fn read_record_at(&self, offset: u64) -> Result<Record> {
        let buf = self.file.read_at(offset, RECORD_HEADER_SIZE)?;
        let header = RecordHeader::decode(&buf);

        let key = self
            .file
            .read_at(offset + RECORD_HEADER_SIZE as u64, header.key_size as usize)?;
        let value = self.file.read_at(
            offset + RECORD_HEADER_SIZE as u64 + header.key_size as u64,
            header.value_size as usize,
        )?;

        let record = Record {
            crc: header.crc,
            flag: header.flag,
            expiration: header.expiration,
            key: Bytes::from(key),
            value: Bytes::from(value),
        };
        record.verify()?;
        Ok(record)
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    /// Apparent size, buffered bytes included.
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.sync()
    }

    pub fn close(&mut self) -> Result<()> {
        self.file.close()
    }
}

/// A former active segment, now immutable and memory-mapped.
#[derive(Debug)]
pub struct SealedSegment {
    file: MmapFile,
    file_id: u64,
}

impl SealedSegment {
    pub fn open(path: &Path, file_id: u64) -> Result<Self> {
        Ok(Self {
            file: MmapFile::open(path)?,
            file_id,
        })
    }

    /// Read and checksum-verify the record starting at `offset`.
    pub fn read_record_at(&self, offset: u64) -> Result<Record> {
        let record = self.decode_record_at(offset)?;
        record.verify()?;
        Ok(record)
    }

    /// Run `f` on every record in the segment, in file order.
    ///
    /// End-of-data ends the iteration cleanly, which is how a record torn by
    /// a crash at the tail of the file is skipped. Checksums are not checked
    /// here: recovery must be able to index a record whose payload is
    /// damaged so that reads of it can report the corruption, while callers
    /// that cannot tolerate damage (merge) verify each record themselves and
    /// abort the iteration through the callback error.
    pub fn for_each_record<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Record, u64, u64) -> Result<()>,
    {
        let mut offset = 0u64;
        loop {
            let record = match self.decode_record_at(offset) {
                Ok(record) => record,
                Err(FirkinError::UnexpectedEof) => break,
                Err(e) => return Err(e),
            };
            f(&record, self.file_id, offset)?;
            offset += record.size();
        }
        Ok(())
    }

    fn decode_record_at(&self, offset: u64) -> Result<Record> {
        let buf = self.file.read_at(offset, RECORD_HEADER_SIZE)?;
        let header = RecordHeader::decode(buf);

        let key = self
            .file
            .read_at(offset + RECORD_HEADER_SIZE as u64, header.key_size as usize)?;
        let value = self.file.read_at(
            offset + RECORD_HEADER_SIZE as u64 + header.key_size as u64,
            header.value_size as usize,
        )?;

        Ok(Record {
            crc: header.crc,
            flag: header.flag,
            expiration: header.expiration,
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        })
    }

    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    pub fn size(&self) -> u64 {
        self.file.len()
    }
}
