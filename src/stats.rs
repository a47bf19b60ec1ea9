use std::sync::atomic::{AtomicU64, Ordering};

/// Central statistics hub for FirkinStore
#[derive(Debug)]
pub struct Statistics {
    // Operation counters
    pub total_gets: AtomicU64,
    pub total_sets: AtomicU64,
    pub total_deletes: AtomicU64,

    // Operation latencies (in nanoseconds)
    pub get_latency_ns: AtomicU64,
    pub set_latency_ns: AtomicU64,
    pub delete_latency_ns: AtomicU64,

    // Segment cache metrics
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub cache_evictions: AtomicU64,

    // Segment lifecycle
    pub rotations: AtomicU64,
    pub bytes_appended: AtomicU64,
    pub hint_files_written: AtomicU64,
    pub hint_failures: AtomicU64,

    // Merge metrics
    pub merged_segments: AtomicU64,
    pub merge_rewritten_records: AtomicU64,
    pub merge_dropped_keys: AtomicU64,

    // Recovery metrics
    pub segments_restored_from_hint: AtomicU64,
    pub segments_restored_from_data: AtomicU64,

    // Error counters
    pub key_not_found_errors: AtomicU64,
    pub corruption_errors: AtomicU64,
    pub ttl_expired_reads: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            total_gets: AtomicU64::new(0),
            total_sets: AtomicU64::new(0),
            total_deletes: AtomicU64::new(0),

            get_latency_ns: AtomicU64::new(0),
            set_latency_ns: AtomicU64::new(0),
            delete_latency_ns: AtomicU64::new(0),

            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_evictions: AtomicU64::new(0),

            rotations: AtomicU64::new(0),
            bytes_appended: AtomicU64::new(0),
            hint_files_written: AtomicU64::new(0),
            hint_failures: AtomicU64::new(0),

            merged_segments: AtomicU64::new(0),
            merge_rewritten_records: AtomicU64::new(0),
            merge_dropped_keys: AtomicU64::new(0),

            segments_restored_from_hint: AtomicU64::new(0),
            segments_restored_from_data: AtomicU64::new(0),

            key_not_found_errors: AtomicU64::new(0),
            corruption_errors: AtomicU64::new(0),
            ttl_expired_reads: AtomicU64::new(0),
        }
    }

    /// Record a get operation
    pub fn record_get(&self, latency_ns: u64) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
        self.get_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
    }

    /// Record a set operation
    pub fn record_set(&self, latency_ns: u64, bytes: u64) {
        self.total_sets.fetch_add(1, Ordering::Relaxed);
        self.set_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a delete operation
    pub fn record_delete(&self, latency_ns: u64) {
        self.total_deletes.fetch_add(1, Ordering::Relaxed);
        self.delete_latency_ns
            .fetch_add(latency_ns, Ordering::Relaxed);
    }

    /// Record a segment cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a segment cache eviction
    pub fn record_cache_eviction(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an active segment rotation
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed hint file
    pub fn record_hint_written(&self) {
        self.hint_files_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed hint file generation
    pub fn record_hint_failure(&self) {
        self.hint_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a merged (reclaimed) segment
    pub fn record_merged_segment(&self, rewritten: u64, dropped: u64) {
        self.merged_segments.fetch_add(1, Ordering::Relaxed);
        self.merge_rewritten_records
            .fetch_add(rewritten, Ordering::Relaxed);
        self.merge_dropped_keys.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Record errors surfaced to callers
    pub fn record_error(&self, error: &crate::error::FirkinError) {
        use crate::error::FirkinError;
        match error {
            FirkinError::KeyNotFound => {
                self.key_not_found_errors.fetch_add(1, Ordering::Relaxed);
            }
            FirkinError::CorruptedRecord => {
                self.corruption_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> StatsSnapshot {
        let total_gets = self.total_gets.load(Ordering::Relaxed);
        let total_sets = self.total_sets.load(Ordering::Relaxed);
        let total_deletes = self.total_deletes.load(Ordering::Relaxed);

        let avg = |total_ns: u64, count: u64| if count > 0 { total_ns / count } else { 0 };

        let cache_hit_rate = {
            let hits = self.cache_hits.load(Ordering::Relaxed);
            let total = hits + self.cache_misses.load(Ordering::Relaxed);
            if total > 0 {
                (hits as f64 / total as f64) * 100.0
            } else {
                0.0
            }
        };

        StatsSnapshot {
            total_operations: total_gets + total_sets + total_deletes,
            total_gets,
            total_sets,
            total_deletes,
            avg_get_latency_ns: avg(self.get_latency_ns.load(Ordering::Relaxed), total_gets),
            avg_set_latency_ns: avg(self.set_latency_ns.load(Ordering::Relaxed), total_sets),
            avg_delete_latency_ns: avg(
                self.delete_latency_ns.load(Ordering::Relaxed),
                total_deletes,
            ),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate,
            cache_evictions: self.cache_evictions.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            hint_files_written: self.hint_files_written.load(Ordering::Relaxed),
            hint_failures: self.hint_failures.load(Ordering::Relaxed),
            merged_segments: self.merged_segments.load(Ordering::Relaxed),
            merge_rewritten_records: self.merge_rewritten_records.load(Ordering::Relaxed),
            merge_dropped_keys: self.merge_dropped_keys.load(Ordering::Relaxed),
            segments_restored_from_hint: self.segments_restored_from_hint.load(Ordering::Relaxed),
            segments_restored_from_data: self.segments_restored_from_data.load(Ordering::Relaxed),
            key_not_found_errors: self.key_not_found_errors.load(Ordering::Relaxed),
            corruption_errors: self.corruption_errors.load(Ordering::Relaxed),
            ttl_expired_reads: self.ttl_expired_reads.load(Ordering::Relaxed),
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of statistics at a point in time
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    // Operations
    pub total_operations: u64,
    pub total_gets: u64,
    pub total_sets: u64,
    pub total_deletes: u64,

    // Latencies (nanoseconds)
    pub avg_get_latency_ns: u64,
    pub avg_set_latency_ns: u64,
    pub avg_delete_latency_ns: u64,

    // Segment cache
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub cache_evictions: u64,

    // Segment lifecycle
    pub rotations: u64,
    pub bytes_appended: u64,
    pub hint_files_written: u64,
    pub hint_failures: u64,

    // Merge
    pub merged_segments: u64,
    pub merge_rewritten_records: u64,
    pub merge_dropped_keys: u64,

    // Recovery
    pub segments_restored_from_hint: u64,
    pub segments_restored_from_data: u64,

    // Errors
    pub key_not_found_errors: u64,
    pub corruption_errors: u64,
    pub ttl_expired_reads: u64,
}

impl StatsSnapshot {
    /// Format statistics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "=== Firkin Statistics ===\n\
            Operations:\n\
            - Total: {}\n\
            - Gets: {} (avg latency: {:.2}μs)\n\
            - Sets: {} (avg latency: {:.2}μs)\n\
            - Deletes: {} (avg latency: {:.2}μs)\n\n\
            Segment Cache:\n\
            - Hit Rate: {:.1}%\n\
            - Hits: {}\n\
            - Misses: {}\n\
            - Evictions: {}\n\n\
            Segments:\n\
            - Rotations: {}\n\
            - Bytes Appended: {:.2} MB\n\
            - Hint Files: {} written, {} failed\n\
            - Merged: {} ({} records rewritten, {} keys dropped)\n\
            - Restored: {} from hints, {} from data\n\n\
            Errors:\n\
            - Key Not Found: {}\n\
            - Corruption: {}\n\
            - Expired Reads: {}",
            self.total_operations,
            self.total_gets,
            self.avg_get_latency_ns as f64 / 1000.0,
            self.total_sets,
            self.avg_set_latency_ns as f64 / 1000.0,
            self.total_deletes,
            self.avg_delete_latency_ns as f64 / 1000.0,
            self.cache_hit_rate,
            self.cache_hits,
            self.cache_misses,
            self.cache_evictions,
            self.rotations,
            self.bytes_appended as f64 / 1_048_576.0,
            self.hint_files_written,
            self.hint_failures,
            self.merged_segments,
            self.merge_rewritten_records,
            self.merge_dropped_keys,
            self.segments_restored_from_hint,
            self.segments_restored_from_data,
            self.key_not_found_errors,
            self.corruption_errors,
            self.ttl_expired_reads,
        )
    }
}
