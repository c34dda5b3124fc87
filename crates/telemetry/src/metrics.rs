//! In-process pipeline metrics.
//!
//! Counters accumulate across runs within a process. `Pipeline::run` logs a
//! snapshot when a run succeeds or fails and returns it with the outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency tracker (sum/count/max, milliseconds).
#[derive(Debug, Default)]
pub struct Timer {
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }
}

/// Collected metrics for the pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Runs
    pub runs_started: Counter,
    pub runs_succeeded: Counter,
    pub runs_failed: Counter,

    // Source
    pub source_queries: Counter,
    pub source_connect_retries: Counter,
    pub rows_extracted: Counter,

    // Store
    pub tables_written: Counter,
    pub rows_written: Counter,
    pub write_rollbacks: Counter,

    // Stage latency
    pub extract_ms: Timer,
    pub transform_ms: Timer,
    pub load_ms: Timer,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            runs_started: self.runs_started.get(),
            runs_succeeded: self.runs_succeeded.get(),
            runs_failed: self.runs_failed.get(),
            source_queries: self.source_queries.get(),
            source_connect_retries: self.source_connect_retries.get(),
            rows_extracted: self.rows_extracted.get(),
            tables_written: self.tables_written.get(),
            rows_written: self.rows_written.get(),
            write_rollbacks: self.write_rollbacks.get(),
            extract_mean_ms: self.extract_ms.mean(),
            transform_mean_ms: self.transform_ms.mean(),
            load_mean_ms: self.load_ms.mean(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub source_queries: u64,
    pub source_connect_retries: u64,
    pub rows_extracted: u64,
    pub tables_written: u64,
    pub rows_written: u64,
    pub write_rollbacks: u64,
    pub extract_mean_ms: f64,
    pub transform_mean_ms: f64,
    pub load_mean_ms: f64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
