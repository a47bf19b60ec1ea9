use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DATA_FILE_EXTENSION, HINT_FILE_EXTENSION};
use crate::error::{FirkinError, Result};

/// Path of a data file: `{:08}.data` inside `dir`.
pub fn data_file_path(dir: &Path, file_id: u64) -> PathBuf {
    dir.join(format!("{:08}.{}", file_id, DATA_FILE_EXTENSION))
}

/// Path of the sidecar hint file: `{:08}.hint` inside `dir`.
pub fn hint_file_path(dir: &Path, file_id: u64) -> PathBuf {
    dir.join(format!("{:08}.{}", file_id, HINT_FILE_EXTENSION))
}

/// Parse the fileId out of a data file name (`00000012.data` -> 12).
pub fn parse_data_file_id(name: &str) -> Result<u64> {
    name.strip_suffix(&format!(".{}", DATA_FILE_EXTENSION))
        .and_then(|stem| stem.parse::<u64>().ok())
        .ok_or(FirkinError::InvalidFileName)
}

/// FileIds of every data file in `dir`, in no particular order.
///
/// Entries without the `.data` extension are ignored; a `.data` file whose
/// stem is not a decimal fileId is an error.
pub fn data_file_ids(dir: &Path) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(&format!(".{}", DATA_FILE_EXTENSION)) {
            continue;
        }
        ids.push(parse_data_file_id(name)?);
    }
    Ok(ids)
}
