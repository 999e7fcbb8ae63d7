//! Loader configuration and metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Configuration for the dynamic loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum raw unit size accepted for translation, in bytes.
    pub max_unit_size: usize,
    /// Reject raw units whose declared path differs from the requested name.
    /// Off by default: compilers are free to emit units under synthetic paths.
    pub strict_name_check: bool,
    /// Minimum host API level stamped into every translated image.
    pub min_host_api: u16,
    /// Run each `define` under a per-name lock so that concurrent
    /// redefinitions of the same name from different threads are serialized.
    /// When false, the last publish wins.
    pub serialize_redefinitions: bool,
}

impl LoaderConfig {
    /// Check if a raw unit length exceeds the size limit.
    pub fn is_unit_oversized(&self, len: usize) -> bool {
        len > self.max_unit_size
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_unit_size: 1 << 20,
            strict_name_check: false,
            min_host_api: 26,
            serialize_redefinitions: false,
        }
    }
}

/// Atomic counters for definition and resolution events.
#[derive(Debug)]
pub struct LoaderMetrics {
    /// Number of successful definitions.
    pub definitions: AtomicU64,
    /// Number of failed definitions.
    pub definition_failures: AtomicU64,
    /// Number of definitions that invalidated an existing cache entry.
    pub redefinitions: AtomicU64,
    /// Number of resolutions answered from the code cache.
    pub cache_hits: AtomicU64,
    /// Number of resolutions refused because the name was in flight.
    pub guarded_misses: AtomicU64,
    /// Number of dead cache entries swept on publish.
    pub entries_swept: AtomicU64,
}

/// Point-in-time copy of [`LoaderMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub definitions: u64,
    pub definition_failures: u64,
    pub redefinitions: u64,
    pub cache_hits: u64,
    pub guarded_misses: u64,
    pub entries_swept: u64,
}

impl LoaderMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            definitions: AtomicU64::new(0),
            definition_failures: AtomicU64::new(0),
            redefinitions: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            guarded_misses: AtomicU64::new(0),
            entries_swept: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero.
    ///
    /// Not available in production builds.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset(&self) {
        self.definitions.store(0, Ordering::Relaxed);
        self.definition_failures.store(0, Ordering::Relaxed);
        self.redefinitions.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.guarded_misses.store(0, Ordering::Relaxed);
        self.entries_swept.store(0, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            definitions: self.definitions.load(Ordering::Relaxed),
            definition_failures: self.definition_failures.load(Ordering::Relaxed),
            redefinitions: self.redefinitions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            guarded_misses: self.guarded_misses.load(Ordering::Relaxed),
            entries_swept: self.entries_swept.load(Ordering::Relaxed),
        }
    }
}

impl Default for LoaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}
