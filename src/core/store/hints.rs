use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::core::keydir::KeyDir;
use crate::error::Result;
use crate::stats::Statistics;
use crate::storage::hint::{HintItem, HintWriter};
use crate::storage::paths::hint_file_path;

/// Ownership of a sealed segment's directory snapshot, handed to the
/// worker at rotation time.
pub(super) struct HintJob {
    pub file_id: u64,
    pub entries: KeyDir,
}

/// Background writer of hint files.
///
/// Rotations queue jobs without waiting; fileIds are unique so overlapping
/// jobs write distinct paths. The only join point is `join`, called when
/// the store closes.
pub(super) struct HintScribe {
    tx: Mutex<Option<Sender<HintJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HintScribe {
    pub fn start(dir: PathBuf, stats: Arc<Statistics>) -> Self {
        let (tx, rx) = unbounded();
        let worker = thread::spawn(move || hint_worker(dir, stats, rx));

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue hint generation for a just-sealed segment.
    pub fn submit(&self, job: HintJob) {
        if let Some(tx) = self.tx.lock().as_ref() {
            let _ = tx.send(job);
        }
    }

    /// Stop accepting jobs, let the worker drain the queue, and join it.
    /// Safe to call more than once.
    pub fn join(&self) {
        self.tx.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

fn hint_worker(dir: PathBuf, stats: Arc<Statistics>, rx: Receiver<HintJob>) {
    for job in rx {
        match write_hint_file(&dir, &job) {
            Ok(()) => stats.record_hint_written(),
            Err(_) => stats.record_hint_failure(),
        }
    }
}

fn write_hint_file(dir: &Path, job: &HintJob) -> Result<()> {
    let mut writer = HintWriter::create(&hint_file_path(dir, job.file_id))?;
    for (key, entry) in job.entries.iter() {
        writer.append(&HintItem {
            flag: entry.flag,
            // The active-side directory does not track expirations; reads
            // check them against the record itself.
            expiration: 0,
            value_size: entry.value_size,
            value_pos: entry.value_pos,
            key: Bytes::copy_from_slice(key.as_bytes()),
        })?;
    }
    writer.close()
}
