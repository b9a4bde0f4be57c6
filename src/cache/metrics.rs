//! Cache Metrics Collection
//!
//! Hierarchy-wide counters and latency tracking. Per-level hit/miss/eviction
//! counts live on each [`CacheLevel`](super::CacheLevel); these cover what
//! only the orchestrator sees.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    // Lookups
    lookups: AtomicU64,
    top_level_hits: AtomicU64,
    deep_hits: AtomicU64,
    misses: AtomicU64,

    // Writes
    puts: AtomicU64,
    put_evictions: AtomicU64,

    // Promotion
    promotions: AtomicU64,
    promotion_evictions: AtomicU64,

    // Operation latencies (microseconds, exponential moving average)
    lookup_latency_us: AtomicU64,
    put_latency_us: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit at 1-based `level`
    pub fn record_hit(&self, level: usize) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if level <= 1 {
            self.top_level_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.deep_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_miss(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_put(&self, evicted: bool) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.put_evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_promotion(&self, evicted: bool) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.promotion_evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_lookup_latency(&self, duration: Duration) {
        Self::update_latency_ema(&self.lookup_latency_us, duration);
    }

    pub fn record_put_latency(&self, duration: Duration) {
        Self::update_latency_ema(&self.put_latency_us, duration);
    }

    fn update_latency_ema(target: &AtomicU64, duration: Duration) {
        let new_us = duration.as_micros() as u64;
        let alpha = 0.1; // EMA smoothing factor

        loop {
            let current = target.load(Ordering::Relaxed);
            let updated = if current == 0 {
                new_us
            } else {
                ((1.0 - alpha) * current as f64 + alpha * new_us as f64) as u64
            };

            if target
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.top_level_hits.load(Ordering::Relaxed) + self.deep_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }

    pub fn lookup_latency(&self) -> Duration {
        Duration::from_micros(self.lookup_latency_us.load(Ordering::Relaxed))
    }

    pub fn put_latency(&self) -> Duration {
        Duration::from_micros(self.put_latency_us.load(Ordering::Relaxed))
    }

    /// Fraction of lookups answered by any level
    pub fn overall_hit_ratio(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: self.lookups(),
            top_level_hits: self.top_level_hits.load(Ordering::Relaxed),
            deep_hits: self.deep_hits.load(Ordering::Relaxed),
            misses: self.misses(),
            puts: self.puts.load(Ordering::Relaxed),
            put_evictions: self.put_evictions.load(Ordering::Relaxed),
            promotions: self.promotions(),
            promotion_evictions: self.promotion_evictions.load(Ordering::Relaxed),
            lookup_latency: self.lookup_latency(),
            put_latency: self.put_latency(),
            overall_hit_ratio: self.overall_hit_ratio(),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.lookups.store(0, Ordering::Relaxed);
        self.top_level_hits.store(0, Ordering::Relaxed);
        self.deep_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.puts.store(0, Ordering::Relaxed);
        self.put_evictions.store(0, Ordering::Relaxed);
        self.promotions.store(0, Ordering::Relaxed);
        self.promotion_evictions.store(0, Ordering::Relaxed);
        self.lookup_latency_us.store(0, Ordering::Relaxed);
        self.put_latency_us.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of all cache metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub top_level_hits: u64,
    pub deep_hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub put_evictions: u64,
    pub promotions: u64,
    pub promotion_evictions: u64,
    pub lookup_latency: Duration,
    pub put_latency: Duration,
    pub overall_hit_ratio: f64,
}

/// Latency tracker helper
pub struct LatencyTracker {
    start: Instant,
}

impl LatencyTracker {
    /// Start tracking latency
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.lookups(), 0);
        assert_eq!(metrics.hits(), 0);
        assert_eq!(metrics.overall_hit_ratio(), 0.0);
    }

    #[test]
    fn test_hit_tracking_by_depth() {
        let metrics = CacheMetrics::new();

        metrics.record_hit(1);
        metrics.record_hit(1);
        metrics.record_hit(3);
        metrics.record_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lookups, 4);
        assert_eq!(snapshot.top_level_hits, 2);
        assert_eq!(snapshot.deep_hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert!((metrics.overall_hit_ratio() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_write_and_promotion_tracking() {
        let metrics = CacheMetrics::new();

        metrics.record_put(false);
        metrics.record_put(true);
        metrics.record_promotion(true);
        metrics.record_promotion(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.puts, 2);
        assert_eq!(snapshot.put_evictions, 1);
        assert_eq!(snapshot.promotions, 2);
        assert_eq!(snapshot.promotion_evictions, 1);
    }

    #[test]
    fn test_latency_tracking() {
        let metrics = CacheMetrics::new();

        metrics.record_lookup_latency(Duration::from_micros(100));
        assert_eq!(metrics.lookup_latency(), Duration::from_micros(100));

        // EMA should smooth values
        metrics.record_lookup_latency(Duration::from_micros(200));
        let latency = metrics.lookup_latency().as_micros();
        assert!(latency > 100 && latency < 200);
    }

    #[test]
    fn test_reset() {
        let metrics = CacheMetrics::new();

        metrics.record_hit(2);
        metrics.record_put(true);
        metrics.record_put_latency(Duration::from_micros(50));

        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lookups, 0);
        assert_eq!(snapshot.deep_hits, 0);
        assert_eq!(snapshot.puts, 0);
        assert_eq!(snapshot.put_latency, Duration::ZERO);
    }

    #[test]
    fn test_latency_tracker() {
        let tracker = LatencyTracker::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(tracker.elapsed() >= Duration::from_millis(10));
    }
}
