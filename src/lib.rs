//! # Firkin - Log-Structured Key-Value Store
//!
// Copyright 2025 The Firkin Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Firkin is an embeddable key-value store in the Bitcask family: every
//! write is an append to a log segment, every read is at most one seek.
//!
//! ## Features
//!
//! - **Append-Only Segments**: All mutations append to a single active
//!   segment; sealed segments are immutable and memory-mapped for reads
//! - **Hash-Indexed Reads**: A process-resident key directory maps every
//!   live key to the exact segment and offset of its latest record
//! - **TTL Expiration**: Records can carry an absolute expiration; expired
//!   keys read as missing and are reclaimed by merge
//! - **Crash Recovery**: Reopening a directory rebuilds the index by
//!   scanning segments, accelerated by sidecar hint files
//! - **Background Merge**: Compaction rewrites live records from old
//!   segments through the normal write path and deletes the originals
//! - **Statistics**: Atomic counters for operations, cache behavior,
//!   rotations, merges and recovery
//!
//! ## Durability
//!
//! Appends land in a configurable write buffer and reach the OS when it
//! fills, the segment rotates, or the store closes. Call [`FirkinStore::sync`]
//! to flush and fsync explicitly; the crash-loss window is bounded by the
//! write buffer size.
//!
//! ## Quick Start
//!
//! ```no_run
//! use firkin::FirkinStore;
//!
//! # fn main() -> firkin::Result<()> {
//! let store = FirkinStore::open("/path/to/db")?;
//!
//! // Insert a key-value pair
//! store.set("key", b"value")?;
//!
//! // Retrieve the value
//! let value = store.get("key")?;
//! assert_eq!(value, b"value");
//!
//! // Delete the key
//! store.delete("key")?;
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Expiring Keys
//!
//! ```no_run
//! # use firkin::FirkinStore;
//! # fn main() -> firkin::Result<()> {
//! # let store = FirkinStore::open("/path/to/db")?;
//! // Session data disappears after an hour
//! store.set_with_ttl("session:123", b"data", 3600)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Using the Builder Pattern
//!
//! ```no_run
//! use firkin::FirkinStore;
//!
//! # fn main() -> firkin::Result<()> {
//! let store = FirkinStore::builder()
//!     .write_buffer_size(1024 * 1024)     // 1 MiB append buffer
//!     .max_file_size(64 * 1024 * 1024)    // rotate segments at 64 MiB
//!     .max_open_files(256)                // sealed-segment cache size
//!     .open("/path/to/db")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture Overview
//!
//! On disk a store is a flat directory of numbered segments
//! (`00000001.data`, `00000002.data`, ...). The highest-numbered segment is
//! the active one and receives all appends through a buffered writer whose
//! unflushed tail is still readable. Older segments are sealed: read-only,
//! memory-mapped, and shared through a reference-counted LRU cache so that
//! reads never race a close.
//!
//! Each segment may have a sidecar hint file (`00000001.hint`), a compact
//! CRC-less index written in the background when the segment is sealed.
//! Recovery replays hint files where they exist and falls back to scanning
//! the data file, always keeping the newest record per key.
//!
//! A single reader-writer lock guards the key directory and the active
//! segment: reads share it, writes and rotation take it exclusively, and
//! reads of sealed segments release it before touching the file. Merge runs
//! at most once at a time, locking per record so readers and writers keep
//! flowing while it compacts.
//!
//! ## Thread Safety
//!
//! All operations take `&self` and can be called concurrently:
//!
//! ```no_run
//! # use firkin::FirkinStore;
//! # use std::sync::Arc;
//! # use std::thread;
//! # fn main() -> firkin::Result<()> {
//! let store = Arc::new(FirkinStore::open("/path/to/db")?);
//! let mut handles = vec![];
//!
//! for i in 0..10 {
//!     let store = Arc::clone(&store);
//!     handles.push(thread::spawn(move || {
//!         let key = format!("key_{}", i);
//!         store.set(&key, b"value").unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The store assumes it owns its directory exclusively: one writing process,
//! any number of in-process readers.

pub mod constants;
pub mod core;
pub mod error;
pub mod stats;
pub mod storage;

pub use crate::core::store::{FirkinStore, StoreBuilder, StoreConfig};
pub use crate::error::{FirkinError, Result};
pub use crate::stats::{Statistics, StatsSnapshot};

#[cfg(test)]
mod tests;
