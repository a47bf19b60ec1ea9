use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::{FirkinError, Result};

/// Writable file with an in-memory tail buffer.
///
/// The apparent size includes bytes still sitting in the buffer, and reads
/// resolve through the buffer, so the file looks contiguous to readers while
/// a tail of recent appends is still in memory.
#[derive(Debug)]
pub struct AppendFile {
    file: File,
    /// Apparent size: bytes on disk plus bytes in the buffer.
    size: u64,
    /// Buffered tail of the file. Capacity is fixed at construction.
    buf: Vec<u8>,
    capacity: usize,
}

impl AppendFile {
    pub fn open(path: &Path, buffer_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file,
            size,
            buf: Vec::with_capacity(buffer_size),
            capacity: buffer_size,
        })
    }

    /// Append `data`, filling and draining the buffer as needed.
    ///
    /// A write that cannot fit the remaining buffer space drains the buffer
    /// first; a single write larger than the whole buffer goes straight to
    /// disk. The apparent size grows by the number of bytes accepted even
    /// when an intermediate flush fails, in which case the error is
    /// surfaced.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut data = data;
        let mut accepted = 0usize;
        let mut failure: Option<FirkinError> = None;

        while data.len() > self.capacity - self.buf.len() && failure.is_none() {
            if self.buf.is_empty() {
                // Large write with an empty buffer: bypass it entirely.
                match self.file.write(data) {
                    Ok(n) => {
                        accepted += n;
                        data = &data[n..];
                    }
                    Err(e) => failure = Some(e.into()),
                }
            } else {
                let room = self.capacity - self.buf.len();
                self.buf.extend_from_slice(&data[..room]);
                accepted += room;
                data = &data[room..];
                if let Err(e) = self.flush() {
                    failure = Some(e);
                }
            }
        }

        if let Some(e) = failure {
            self.size += accepted as u64;
            return Err(e);
        }

        self.buf.extend_from_slice(data);
        accepted += data.len();
        self.size += accepted as u64;
        Ok(accepted)
    }

    /// Read `len` bytes starting at `offset`, through the buffer if needed.
    ///
    /// The range may land in the on-disk prefix, the buffered tail, or span
    /// both; a contiguous copy is returned. Reads past the apparent end
    /// signal `UnexpectedEof`.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if offset > self.size {
            return Err(FirkinError::InvalidOffset);
        }

        let disk_size = self.size - self.buf.len() as u64;

        // Entirely within the buffered tail.
        if offset >= disk_size {
            let start = (offset - disk_size) as usize;
            if start + len > self.buf.len() {
                return Err(FirkinError::UnexpectedEof);
            }
            return Ok(self.buf[start..start + len].to_vec());
        }

        let mut data = vec![0u8; len];

        // Entirely on disk.
        if offset + len as u64 <= disk_size {
            self.file.read_exact_at(&mut data, offset)?;
            return Ok(data);
        }

        // Spans the disk prefix and the buffered tail.
        let head = (disk_size - offset) as usize;
        self.file.read_exact_at(&mut data[..head], offset)?;
        let tail = len - head;
        if tail > self.buf.len() {
            return Err(FirkinError::UnexpectedEof);
        }
        data[head..].copy_from_slice(&self.buf[..tail]);
        Ok(data)
    }

    /// Drain the buffer to disk.
    ///
    /// On error the unwritten suffix is compacted to the front of the buffer
    /// so a later flush retries exactly the bytes that did not make it out.
    pub fn flush(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }

        let mut written = 0;
        while written < self.buf.len() {
            match self.file.write(&self.buf[written..]) {
                Ok(0) => {
                    self.buf.drain(..written);
                    return Err(io::Error::from(io::ErrorKind::WriteZero).into());
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.drain(..written);
                    return Err(e.into());
                }
            }
        }
        self.buf.clear();
        Ok(())
    }

    /// Flush the buffer and fsync the file.
    pub fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Flush outstanding bytes; the descriptor closes on drop.
    pub fn close(&mut self) -> Result<()> {
        self.flush()
    }

    /// Apparent size: on-disk bytes plus buffered bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}
