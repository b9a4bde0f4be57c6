//! Multilevel Cache - Level Orchestration
//!
//! Owns the ordered level stack and implements the lookup cascade, read
//! promotion, write-to-top and dynamic level management.
//!
//! # Locking
//!
//! The level list sits behind a `RwLock` that is held only to clone a
//! snapshot of `Arc<CacheLevel>` handles (data path) or to splice the list
//! (add/remove). Each level then serialises its own map and policy. At most
//! one level lock is held at a time and promotion writes run from level 1
//! downward, so no lock ordering cycle can form.
//!
//! A lookup that raced a `remove_cache_level` may still write into the
//! detached level; those writes are dropped with it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use super::config::{CacheConfig, LevelConfig, PromotionMode};
use super::level::{CacheLevel, LevelStats, Promotion};
use super::metrics::{CacheMetrics, LatencyTracker, MetricsSnapshot};
use super::policy::PolicyKind;
use crate::error::{Error, Result};

/// Cache lookup result
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// The cached value
    pub value: Bytes,
    /// Level (1-based) the value was found in
    pub level: usize,
    /// Lookup latency, including promotion writes
    pub latency: Duration,
}

/// Point-in-time contents of one level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSnapshot {
    /// Level number (1-based)
    pub level: usize,
    /// Capacity in entries
    pub capacity: usize,
    /// Eviction policy
    pub policy: PolicyKind,
    /// Entries, sorted by key
    pub entries: Vec<(String, Bytes)>,
}

impl fmt::Display for LevelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} Cache:", self.level)?;
        for (key, value) in &self.entries {
            write!(f, " {}: {}", key, String::from_utf8_lossy(value))?;
        }
        Ok(())
    }
}

/// Tiered cache: level 1 is the fastest and smallest
pub struct MultilevelCache {
    /// Levels in lookup order
    levels: RwLock<Vec<Arc<CacheLevel>>>,
    /// How promotion writes interact with receiving policies
    promotion: PromotionMode,
    /// Metrics collector
    metrics: CacheMetrics,
}

impl MultilevelCache {
    /// Create an empty hierarchy with cold promotion
    pub fn new() -> Self {
        Self::with_promotion(PromotionMode::default())
    }

    /// Create an empty hierarchy with the given promotion mode
    pub fn with_promotion(promotion: PromotionMode) -> Self {
        Self {
            levels: RwLock::new(Vec::new()),
            promotion,
            metrics: CacheMetrics::new(),
        }
    }

    /// Build a hierarchy from configuration.
    ///
    /// Fails on the first invalid level; nothing partially built is returned.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let cache = Self::with_promotion(config.promotion);
        for level in &config.levels {
            cache.add_configured_level(level)?;
        }
        Ok(cache)
    }

    /// Append a new slowest level. Returns its 1-based number.
    #[instrument(skip(self))]
    pub fn add_cache_level(&self, capacity: usize, policy: PolicyKind) -> Result<usize> {
        let level = Arc::new(CacheLevel::new(capacity, policy)?);

        let mut levels = self.levels.write();
        levels.push(level);
        let number = levels.len();
        info!(level = number, capacity, %policy, "added cache level");
        Ok(number)
    }

    /// Append a level described by name, e.g. from a config file.
    ///
    /// An unknown policy name fails without touching the hierarchy.
    pub fn add_configured_level(&self, config: &LevelConfig) -> Result<usize> {
        let policy = config.validate().map_err(|e| {
            warn!(
                policy = %config.policy,
                capacity = config.capacity,
                "rejected cache level: {}",
                e
            );
            e
        })?;
        self.add_cache_level(config.capacity, policy)
    }

    /// Remove the 1-based `level` and its contents; deeper levels shift up
    #[instrument(skip(self))]
    pub fn remove_cache_level(&self, level: usize) -> Result<()> {
        let mut levels = self.levels.write();
        let count = levels.len();
        if level == 0 || level > count {
            warn!(level, count, "cache level out of range");
            return Err(Error::LevelOutOfRange { level, count });
        }

        let removed = levels.remove(level - 1);
        info!(
            level,
            entries = removed.len(),
            remaining = levels.len(),
            "removed cache level"
        );
        Ok(())
    }

    /// Clone the current level handles
    fn snapshot_levels(&self) -> Result<Vec<Arc<CacheLevel>>> {
        let levels = self.levels.read();
        if levels.is_empty() {
            return Err(Error::NoLevels);
        }
        Ok(levels.clone())
    }

    /// Look a key up, level 1 first.
    ///
    /// On a hit at level `n`, the value is seeded into levels `1..n` before
    /// returning. A faster level that gained the key after this lookup missed
    /// it keeps its own, newer value. A key absent everywhere yields [`Error::NotFound`].
    pub fn get(&self, key: &str) -> Result<CacheHit> {
        let tracker = LatencyTracker::start();
        let levels = self.snapshot_levels()?;

        for (idx, level) in levels.iter().enumerate() {
            let Some(value) = level.get(key) else {
                continue;
            };

            for upper in &levels[..idx] {
                match upper.promote(key, value.clone(), self.promotion)? {
                    Promotion::Inserted { evicted } => {
                        self.metrics.record_promotion(evicted.is_some())
                    }
                    Promotion::Present => {
                        debug!(key, "skipped promotion over newer entry");
                    }
                }
            }
            if idx > 0 {
                debug!(key, from = idx + 1, mode = %self.promotion, "promoted cache entry");
            }

            let latency = tracker.elapsed();
            self.metrics.record_hit(idx + 1);
            self.metrics.record_lookup_latency(latency);
            return Ok(CacheHit {
                value,
                level: idx + 1,
                latency,
            });
        }

        self.metrics.record_miss();
        self.metrics.record_lookup_latency(tracker.elapsed());
        Err(Error::NotFound(key.to_owned()))
    }

    /// Write to level 1 only.
    ///
    /// Copies of `key` at deeper levels are left as they are. They cannot be
    /// observed while level 1 holds the key, since lookups stop at the first hit.
    pub fn put(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        let tracker = LatencyTracker::start();
        let top = {
            let levels = self.levels.read();
            levels.first().cloned().ok_or(Error::NoLevels)?
        };

        let evicted = top.put(key, value.into())?;
        self.metrics.record_put(evicted.is_some());
        self.metrics.record_put_latency(tracker.elapsed());
        Ok(())
    }

    /// True if any level holds `key`. Does not touch any policy.
    pub fn contains(&self, key: &str) -> bool {
        self.levels.read().iter().any(|level| level.contains(key))
    }

    /// Handle to the 1-based `level`
    pub fn level(&self, level: usize) -> Option<Arc<CacheLevel>> {
        let levels = self.levels.read();
        level.checked_sub(1).and_then(|idx| levels.get(idx).cloned())
    }

    /// Number of levels
    pub fn level_count(&self) -> usize {
        self.levels.read().len()
    }

    /// True if no levels exist
    pub fn is_empty(&self) -> bool {
        self.levels.read().is_empty()
    }

    /// Promotion mode
    pub fn promotion_mode(&self) -> PromotionMode {
        self.promotion
    }

    /// Statistics for the 1-based `level`
    pub fn level_stats(&self, level: usize) -> Result<LevelStats> {
        self.level(level)
            .map(|l| l.stats())
            .ok_or_else(|| Error::LevelOutOfRange {
                level,
                count: self.level_count(),
            })
    }

    /// Statistics for every level, fastest first
    pub fn stats(&self) -> Vec<LevelStats> {
        self.levels.read().iter().map(|l| l.stats()).collect()
    }

    /// Hierarchy-wide metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zero hierarchy-wide metrics
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Entries across all levels (a key cached at two levels counts twice)
    pub fn total_entries(&self) -> usize {
        self.levels.read().iter().map(|l| l.len()).sum()
    }

    /// Empty every level, keeping the structure
    pub fn clear(&self) {
        for level in self.levels.read().iter() {
            level.clear();
        }
    }

    /// Contents of every level, fastest first.
    ///
    /// Diagnostic only: levels are read one after another, so the result is
    /// not an atomic cut across levels.
    pub fn display_cache(&self) -> Vec<LevelSnapshot> {
        self.levels
            .read()
            .iter()
            .enumerate()
            .map(|(idx, level)| LevelSnapshot {
                level: idx + 1,
                capacity: level.capacity(),
                policy: level.policy_kind(),
                entries: level.snapshot(),
            })
            .collect()
    }
}

impl Default for MultilevelCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MultilevelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultilevelCache")
            .field("levels", &*self.levels.read())
            .field("promotion", &self.promotion)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
