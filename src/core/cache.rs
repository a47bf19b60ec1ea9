use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;

use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::error::Result;
use crate::stats::Statistics;
use crate::storage::segment::SealedSegment;

/// Reference-counted LRU of open sealed segments.
///
/// The recency list itself holds one reference to every segment it
/// contains; guards handed to callers hold additional references. A
/// segment's slot leaves the index only when its count reaches zero after
/// leaving the list, so capacity pressure can never invalidate a guard a
/// reader still holds.
pub struct SegmentCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    stats: Arc<Statistics>,
}

struct CacheInner {
    /// FileIds currently in the list, most recently used at the front.
    lru: VecDeque<u64>,
    slots: HashMap<u64, CacheSlot, RandomState>,
}

struct CacheSlot {
    segment: Arc<SealedSegment>,
    /// References held by the list (at most one) and by outstanding guards.
    ref_count: usize,
    in_list: bool,
}

/// Pinned handle to a cached segment. Releases its reference on drop.
pub struct SegmentGuard<'a> {
    cache: &'a SegmentCache,
    segment: Arc<SealedSegment>,
    file_id: u64,
}

impl Deref for SegmentGuard<'_> {
    type Target = SealedSegment;

    fn deref(&self) -> &SealedSegment {
        &self.segment
    }
}

impl Drop for SegmentGuard<'_> {
    fn drop(&mut self) {
        self.cache.release(self.file_id);
    }
}

impl SegmentCache {
    pub fn new(capacity: usize, stats: Arc<Statistics>) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CACHE_CAPACITY
        } else {
            capacity
        };

        Self {
            inner: Mutex::new(CacheInner {
                lru: VecDeque::with_capacity(capacity),
                slots: HashMap::default(),
            }),
            capacity,
            stats,
        }
    }

    /// Pin the segment `file_id`, opening it from `path` if it is not
    /// already cached, and return a guard holding it open.
    pub fn acquire(&self, path: &Path, file_id: u64) -> Result<SegmentGuard<'_>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let segment = match inner.slots.get_mut(&file_id) {
            Some(slot) => {
                slot.ref_count += 1;
                if slot.in_list {
                    if let Some(pos) = inner.lru.iter().position(|id| *id == file_id) {
                        inner.lru.remove(pos);
                        inner.lru.push_front(file_id);
                    }
                }
                self.stats.record_cache_lookup(true);
                Arc::clone(&slot.segment)
            }
            None => {
                let segment = Arc::new(SealedSegment::open(path, file_id)?);
                // One reference for the list, one for the caller.
                inner.slots.insert(
                    file_id,
                    CacheSlot {
                        segment: Arc::clone(&segment),
                        ref_count: 2,
                        in_list: true,
                    },
                );
                inner.lru.push_front(file_id);
                self.stats.record_cache_lookup(false);
                segment
            }
        };

        while inner.lru.len() > self.capacity {
            if let Some(victim) = inner.lru.pop_back() {
                if let Some(slot) = inner.slots.get_mut(&victim) {
                    slot.in_list = false;
                }
                Self::release_slot(inner, victim);
                self.stats.record_cache_eviction();
            }
        }

        Ok(SegmentGuard {
            cache: self,
            segment,
            file_id,
        })
    }

    /// Drop the list's reference to `file_id` if it is in the list.
    ///
    /// Used at open time so the segment about to become active is not left
    /// open in the cache as well.
    pub fn evict(&self, file_id: u64) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let in_list = match inner.slots.get_mut(&file_id) {
            Some(slot) if slot.in_list => {
                slot.in_list = false;
                true
            }
            _ => false,
        };
        if in_list {
            inner.lru.retain(|id| *id != file_id);
            Self::release_slot(inner, file_id);
        }
    }

    /// Drain the list. Segments with outstanding guards stay open until
    /// those guards drop.
    pub fn close(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        while let Some(file_id) = inner.lru.pop_back() {
            if let Some(slot) = inner.slots.get_mut(&file_id) {
                slot.in_list = false;
            }
            Self::release_slot(inner, file_id);
        }
    }

    /// Number of segments currently open, pinned ones included.
    pub fn open_segments(&self) -> usize {
        self.inner.lock().slots.len()
    }

    fn release(&self, file_id: u64) {
        let mut inner = self.inner.lock();
        Self::release_slot(&mut inner, file_id);
    }

    fn release_slot(inner: &mut CacheInner, file_id: u64) {
        if let Some(slot) = inner.slots.get_mut(&file_id) {
            slot.ref_count -= 1;
            if slot.ref_count == 0 && !slot.in_list {
                // The mapping is released once the last Arc clone drops.
                inner.slots.remove(&file_id);
            }
        }
    }
}
