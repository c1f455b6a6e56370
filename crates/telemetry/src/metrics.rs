//! Internal metrics collection.
//!
//! Collects metrics in-memory; snapshots are logged after each ingestion
//! run and served by the operational API.

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

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the backblast miner.
#[derive(Debug, Default)]
pub struct Metrics {
    // Channel scans
    pub channel_scans: Counter,
    pub channel_scan_failures: Counter,
    pub messages_scanned: Counter,
    pub backblast_candidates: Counter,

    // Per-message outcomes
    pub records_upserted: Counter,
    pub parse_failures: Counter,
    pub processing_failures: Counter,

    // Replies
    pub replies_sent: Counter,
    pub reply_failures: Counter,

    // Scheduler
    pub ingestion_runs: Counter,
    pub overlapping_runs_skipped: Counter,
    pub directory_syncs: Counter,
    pub reports_posted: Counter,

    // Latency histograms
    pub channel_scan_latency_ms: Histogram,
    pub upsert_latency_ms: Histogram,

    // Gauges
    pub channels_in_flight: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub channel_scans: u64,
    pub channel_scan_failures: u64,
    pub messages_scanned: u64,
    pub backblast_candidates: u64,
    pub records_upserted: u64,
    pub parse_failures: u64,
    pub processing_failures: u64,
    pub replies_sent: u64,
    pub reply_failures: u64,
    pub ingestion_runs: u64,
    pub overlapping_runs_skipped: u64,
    pub directory_syncs: u64,
    pub reports_posted: u64,
    pub channel_scan_latency_mean_ms: f64,
    pub upsert_latency_mean_ms: f64,
    pub channels_in_flight: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            channel_scans: self.channel_scans.get(),
            channel_scan_failures: self.channel_scan_failures.get(),
            messages_scanned: self.messages_scanned.get(),
            backblast_candidates: self.backblast_candidates.get(),
            records_upserted: self.records_upserted.get(),
            parse_failures: self.parse_failures.get(),
            processing_failures: self.processing_failures.get(),
            replies_sent: self.replies_sent.get(),
            reply_failures: self.reply_failures.get(),
            ingestion_runs: self.ingestion_runs.get(),
            overlapping_runs_skipped: self.overlapping_runs_skipped.get(),
            directory_syncs: self.directory_syncs.get(),
            reports_posted: self.reports_posted.get(),
            channel_scan_latency_mean_ms: self.channel_scan_latency_ms.mean(),
            upsert_latency_mean_ms: self.upsert_latency_ms.mean(),
            channels_in_flight: self.channels_in_flight.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
