use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FirkinError {
    #[error(
        "Invalid key size: key must be 1-{} bytes",
        crate::constants::MAX_KEY_SIZE
    )]
    InvalidKeySize,

    #[error(
        "Invalid value size: value must be at most {} bytes",
        crate::constants::MAX_VALUE_SIZE
    )]
    InvalidValueSize,

    #[error("Invalid read offset past end of file")]
    InvalidOffset,

    #[error("Key not found")]
    KeyNotFound,

    #[error("Corrupted record")]
    CorruptedRecord,

    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("Invalid data file name")]
    InvalidFileName,

    #[error("Store is read-only after a failed append")]
    ReadOnly,

    #[error("Store is shutting down")]
    ShuttingDown,

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FirkinError>;
