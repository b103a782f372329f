//! Cache metrics recording.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

/// Describes the cache metrics to the installed recorder.
/// Call once at startup; calling it again is harmless.
pub fn register_cache_metrics() {
    metrics::describe_counter!("hoard_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("hoard_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "hoard_cache_loads_total",
        "Total number of entries resolved from storage or a factory"
    );
    metrics::describe_counter!(
        "hoard_cache_load_failures_total",
        "Total number of failed loads"
    );
    metrics::describe_counter!("hoard_cache_deletes_total", "Total number of deleted entries");
    metrics::describe_counter!(
        "hoard_cache_rollbacks_total",
        "Total number of writes undone after a storage failure"
    );
    metrics::describe_gauge!("hoard_cache_entries", "Current number of entries in cache");
    metrics::describe_histogram!(
        "hoard_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Metrics recorder for one cache manager.
///
/// Keeps atomic counters for in-process inspection and, when enabled,
/// forwards every event to the global `metrics` recorder labelled with the
/// cache name.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    cache: Arc<str>,
    enabled: bool,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    loads: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new(cache: impl Into<Arc<str>>, enabled: bool) -> Self {
        Self {
            cache: cache.into(),
            enabled,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            loads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the cache label.
    pub fn cache(&self) -> &str {
        &self.cache
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            counter!("hoard_cache_hits_total", "cache" => self.cache.to_string()).increment(1);
        }
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            counter!("hoard_cache_misses_total", "cache" => self.cache.to_string()).increment(1);
        }
    }

    /// Records an entry resolved from storage or a factory.
    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            counter!("hoard_cache_loads_total", "cache" => self.cache.to_string()).increment(1);
        }
    }

    pub fn record_load_failure(&self) {
        if self.enabled {
            counter!("hoard_cache_load_failures_total", "cache" => self.cache.to_string())
                .increment(1);
        }
    }

    pub fn record_delete(&self) {
        if self.enabled {
            counter!("hoard_cache_deletes_total", "cache" => self.cache.to_string()).increment(1);
        }
    }

    /// Records a write that was abandoned because storage rejected it.
    pub fn record_rollback(&self) {
        if self.enabled {
            counter!("hoard_cache_rollbacks_total", "cache" => self.cache.to_string())
                .increment(1);
        }
    }

    pub fn update_entry_count(&self, count: usize) {
        if self.enabled {
            gauge!("hoard_cache_entries", "cache" => self.cache.to_string()).set(count as f64);
        }
    }

    /// Records the duration of an operation.
    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        if self.enabled {
            histogram!(
                "hoard_cache_operation_seconds",
                "cache" => self.cache.to_string(),
                "operation" => operation
            )
            .record(duration.as_secs_f64());
        }
    }

    /// Runs `f` and records how long it took.
    pub fn time_operation<T, F: FnOnce() -> T>(&self, operation: &'static str, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.record_operation_duration(operation, start.elapsed());
        result
    }

    /// Hit rate over the lifetime of the manager (0.0 before any lookup).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}
