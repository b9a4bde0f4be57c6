//! Cache Eviction Policies
//!
//! Per-level victim selection. Every [`CacheLevel`](super::CacheLevel) owns
//! exactly one policy instance and keeps it in lockstep with its entry map:
//! each stored key has exactly one tracking record here.
//!
//! # Variants
//!
//! ```text
//!   LRU  order: BTreeMap<tick, key>   oldest tick ──▶ victim      O(log n)
//!        index: HashMap<key, tick>
//!
//!   LFU  counts: HashMap<key, hits>   min (hits, stamp) ──▶ victim  O(n)
//!        stamps: HashMap<key, seq>
//! ```
//!
//! Cold admission (used by promotion) places a key where it is the next
//! candidate for eviction: the least-recent end for LRU, zero hits for LFU.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Victim selection strategy for a single cache level
pub trait EvictionPolicy: fmt::Debug + Send + Sync {
    /// Which variant this is
    fn kind(&self) -> PolicyKind;

    /// Record that `key` was just inserted or read
    fn touch(&mut self, key: &str);

    /// Start tracking `key` at the coldest position without counting an access.
    ///
    /// No-op if the key is already tracked.
    fn admit_cold(&mut self, key: &str);

    /// Key that the next [`evict`](Self::evict) would return
    fn peek_victim(&self) -> Option<&str>;

    /// Remove and return the tracking record of exactly one victim.
    ///
    /// Returns `None` when nothing is tracked.
    fn evict(&mut self) -> Option<String>;

    /// Drop the tracking record for `key`
    fn remove(&mut self, key: &str) -> bool;

    /// Number of tracked keys
    fn len(&self) -> usize;

    /// True if no keys are tracked
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every tracked key
    fn clear(&mut self);
}

/// Enumerated set of supported policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyKind {
    /// Least recently used
    Lru,
    /// Least frequently used, ties broken by earliest touch
    Lfu,
}

impl PolicyKind {
    /// Construct a fresh policy instance of this kind
    pub fn build(self) -> Box<dyn EvictionPolicy> {
        match self {
            PolicyKind::Lru => Box::new(LruPolicy::new()),
            PolicyKind::Lfu => Box::new(LfuPolicy::new()),
        }
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Lru => "LRU",
            PolicyKind::Lfu => "LFU",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(PolicyKind::Lru),
            "LFU" => Ok(PolicyKind::Lfu),
            other => Err(Error::Config(format!("unknown eviction policy: {}", other))),
        }
    }
}

// =============================================================================
// LRU
// =============================================================================

/// Least-recently-used ordering.
///
/// Recency is a single ordered map keyed by a monotonically increasing tick,
/// with a reverse index for O(1) lookup of a key's current tick. Cold
/// admissions draw ticks from a decreasing counter so they sort before every
/// touched key.
#[derive(Debug)]
pub struct LruPolicy {
    order: BTreeMap<i64, String>,
    index: HashMap<String, i64>,
    next_hot: i64,
    next_cold: i64,
}

impl LruPolicy {
    /// Create an empty LRU policy
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            index: HashMap::new(),
            next_hot: 0,
            next_cold: -1,
        }
    }

    /// Tracked keys from least to most recent
    pub fn recency_order(&self) -> Vec<&str> {
        self.order.values().map(String::as_str).collect()
    }
}

impl Default for LruPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl EvictionPolicy for LruPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_hot;
        self.next_hot += 1;

        match self.index.get_mut(key) {
            Some(pos) => {
                let owned = self
                    .order
                    .remove(&*pos)
                    .unwrap_or_else(|| key.to_owned());
                *pos = tick;
                self.order.insert(tick, owned);
            }
            None => {
                self.index.insert(key.to_owned(), tick);
                self.order.insert(tick, key.to_owned());
            }
        }
    }

    fn admit_cold(&mut self, key: &str) {
        if self.index.contains_key(key) {
            return;
        }
        let tick = self.next_cold;
        self.next_cold -= 1;
        self.index.insert(key.to_owned(), tick);
        self.order.insert(tick, key.to_owned());
    }

    fn peek_victim(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    fn evict(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.index.remove(&key);
        Some(key)
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(pos) => {
                self.order.remove(&pos);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

// =============================================================================
// LFU
// =============================================================================

/// Least-frequently-used selection.
///
/// Each touch bumps the key's count and restamps it with the current
/// sequence number. The victim is the minimum `(count, stamp)` pair, found by
/// a linear scan.
#[derive(Debug, Default)]
pub struct LfuPolicy {
    counts: HashMap<String, u64>,
    stamps: HashMap<String, u64>,
    clock: u64,
}

impl LfuPolicy {
    /// Create an empty LFU policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Access count recorded for `key`
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    fn tick(&mut self) -> u64 {
        let seq = self.clock;
        self.clock += 1;
        seq
    }
}

impl EvictionPolicy for LfuPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lfu
    }

    fn touch(&mut self, key: &str) {
        let seq = self.tick();
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_owned(), 1);
            }
        }
        match self.stamps.get_mut(key) {
            Some(stamp) => *stamp = seq,
            None => {
                self.stamps.insert(key.to_owned(), seq);
            }
        }
    }

    fn admit_cold(&mut self, key: &str) {
        if self.counts.contains_key(key) {
            return;
        }
        let seq = self.tick();
        self.counts.insert(key.to_owned(), 0);
        self.stamps.insert(key.to_owned(), seq);
    }

    fn peek_victim(&self) -> Option<&str> {
        self.counts
            .iter()
            .min_by_key(|(key, count)| {
                let stamp = self.stamps.get(key.as_str()).copied().unwrap_or(u64::MAX);
                (**count, stamp)
            })
            .map(|(key, _)| key.as_str())
    }

    fn evict(&mut self) -> Option<String> {
        let victim = self.peek_victim()?.to_owned();
        self.counts.remove(&victim);
        self.stamps.remove(&victim);
        Some(victim)
    }

    fn remove(&mut self, key: &str) -> bool {
        self.stamps.remove(key);
        self.counts.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn clear(&mut self) {
        self.counts.clear();
        self.stamps.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
