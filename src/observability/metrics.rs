//! Metrics registry for batch loading
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every loader of one registry.
///
/// All counters use Relaxed ordering; exact cross-counter consistency is not
/// required.
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    /// Batches handed to `BatchLoader::load`
    batches_loaded: AtomicU64,
    /// Descriptors across all loaded batches
    queries_loaded: AtomicU64,
    /// Pipelines that used the `$or` + `$facet` form
    merged_pipelines: AtomicU64,
    /// Store round trips issued
    round_trips: AtomicU64,
    /// Round trips that failed
    store_failures: AtomicU64,
    /// Batches rejected before reaching the store
    batches_rejected: AtomicU64,
    /// Partition keys absent from a container result
    empty_partitions: AtomicU64,
}

impl LoaderMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch of `queries` descriptors
    pub fn record_batch(&self, queries: usize) {
        self.batches_loaded.fetch_add(1, Ordering::Relaxed);
        self.queries_loaded
            .fetch_add(queries as u64, Ordering::Relaxed);
    }

    /// Record a merged (partitioned) pipeline
    pub fn increment_merged_pipelines(&self) {
        self.merged_pipelines.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a store round trip
    pub fn increment_round_trips(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed store round trip
    pub fn increment_store_failures(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch rejected during merging
    pub fn increment_batches_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record partitions missing from a container result
    pub fn add_empty_partitions(&self, count: u64) {
        self.empty_partitions.fetch_add(count, Ordering::Relaxed);
    }

    /// Get round trips issued
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_loaded: self.batches_loaded.load(Ordering::Relaxed),
            queries_loaded: self.queries_loaded.load(Ordering::Relaxed),
            merged_pipelines: self.merged_pipelines.load(Ordering::Relaxed),
            round_trips: self.round_trips.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            empty_partitions: self.empty_partitions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches_loaded: u64,
    pub queries_loaded: u64,
    pub merged_pipelines: u64,
    pub round_trips: u64,
    pub store_failures: u64,
    pub batches_rejected: u64,
    pub empty_partitions: u64,
}
