use bytes::Bytes;

use crate::constants::{FLAG_TOMBSTONE, RECORD_HEADER_SIZE};
use crate::error::{FirkinError, Result};

/// A single on-disk entry: 24-byte header, key, value.
///
/// The header is `crc32 | flag | expiration | key_size | value_size`, all
/// little-endian. The checksum covers everything after itself, key and
/// value included. An expiration of 0 means the record never expires;
/// tombstones carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Checksum as stored on disk; 0 until the record has been encoded.
    pub crc: u32,
    pub flag: u32,
    /// Seconds since the epoch; 0 = no expiration.
    pub expiration: i64,
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::with_expiration(key, value, 0)
    }

    pub fn with_expiration(key: impl Into<Bytes>, value: impl Into<Bytes>, expiration: i64) -> Self {
        Self {
            crc: 0,
            flag: 0,
            expiration,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A delete marker for `key`: tombstone bit set, empty value.
    pub fn tombstone(key: impl Into<Bytes>) -> Self {
        Self {
            crc: 0,
            flag: FLAG_TOMBSTONE,
            expiration: 0,
            key: key.into(),
            value: Bytes::new(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.flag & FLAG_TOMBSTONE != 0
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expiration > 0 && self.expiration <= now
    }

    /// Encoded size of the record: header plus key plus value.
    pub fn size(&self) -> u64 {
        (RECORD_HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Checksum over the header tail, key and value.
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.header_tail());
        hasher.update(&self.key);
        hasher.update(&self.value);
        hasher.finalize()
    }

    /// Encode the header, computing and embedding the checksum.
    pub fn encode_header(&self) -> [u8; RECORD_HEADER_SIZE] {
        let mut header = [0u8; RECORD_HEADER_SIZE];
        header[4..].copy_from_slice(&self.header_tail());
        header[0..4].copy_from_slice(&self.checksum().to_le_bytes());
        header
    }

    /// Verify the stored checksum against the record contents.
    pub fn verify(&self) -> Result<()> {
        if self.checksum() != self.crc {
            return Err(FirkinError::CorruptedRecord);
        }
        Ok(())
    }

    fn header_tail(&self) -> [u8; RECORD_HEADER_SIZE - 4] {
        let mut tail = [0u8; RECORD_HEADER_SIZE - 4];
        tail[0..4].copy_from_slice(&self.flag.to_le_bytes());
        tail[4..12].copy_from_slice(&(self.expiration as u64).to_le_bytes());
        tail[12..16].copy_from_slice(&(self.key.len() as u32).to_le_bytes());
        tail[16..20].copy_from_slice(&(self.value.len() as u32).to_le_bytes());
        tail
    }
}

/// Decoded record header, before the key and value have been read.
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub crc: u32,
    pub flag: u32,
    pub expiration: i64,
    pub key_size: u32,
    pub value_size: u32,
}

impl RecordHeader {
    /// Decode a 24-byte header. The caller guarantees the slice length.
    pub fn decode(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), RECORD_HEADER_SIZE);
        Self {
            crc: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            flag: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            expiration: u64::from_le_bytes(buf[8..16].try_into().unwrap()) as i64,
            key_size: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            value_size: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
        }
    }
}
