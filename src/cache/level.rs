//! Cache Level - Capacity-Bounded Store
//!
//! A single tier of the hierarchy: a key → value map paired with the eviction
//! policy that orders it. Map and policy sit behind one lock so they can never
//! disagree about which keys are present.
//!
//! # Invariants
//!
//! - `len() <= capacity()` after every call returns
//! - every stored key has exactly one tracking record in the policy

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::config::PromotionMode;
use super::policy::{EvictionPolicy, PolicyKind};
use crate::error::{Error, Result};

/// Map and policy guarded together
#[derive(Debug)]
struct LevelState {
    entries: HashMap<String, Bytes>,
    policy: Box<dyn EvictionPolicy>,
}

/// Result of a promotion write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// The key was seeded into the level, possibly evicting a victim
    Inserted { evicted: Option<String> },
    /// The level already held the key; nothing was written
    Present,
}

/// A capacity-bounded key → value store with a pluggable eviction policy
pub struct CacheLevel {
    /// Maximum number of entries
    capacity: usize,
    /// Policy variant, fixed at construction
    kind: PolicyKind,
    /// Entries and policy bookkeeping
    state: RwLock<LevelState>,
    /// Hit count
    hits: AtomicU64,
    /// Miss count
    misses: AtomicU64,
    /// Eviction count
    evictions: AtomicU64,
    /// Promotion writes received
    promotions: AtomicU64,
}

impl CacheLevel {
    /// Create a level with a fresh policy of the given kind
    pub fn new(capacity: usize, kind: PolicyKind) -> Result<Self> {
        Self::with_policy(capacity, kind.build())
    }

    /// Create a level around an existing (empty) policy instance
    pub fn with_policy(capacity: usize, policy: Box<dyn EvictionPolicy>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("level capacity must be positive".into()));
        }
        if !policy.is_empty() {
            return Err(Error::Config("eviction policy must start with no tracked keys".into()));
        }

        Ok(Self {
            capacity,
            kind: policy.kind(),
            state: RwLock::new(LevelState {
                entries: HashMap::with_capacity(capacity),
                policy,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
        })
    }

    /// Look up a key, recording the access with the policy on a hit
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.write();

        match state.entries.get(key).cloned() {
            Some(value) => {
                state.policy.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite a key and record the access.
    ///
    /// A new key arriving at a full level first evicts one victim chosen by
    /// the policy. Returns the evicted key, if any.
    pub fn put(&self, key: &str, value: Bytes) -> Result<Option<String>> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let evicted = match state.entries.get_mut(key) {
            Some(slot) => {
                *slot = value;
                None
            }
            None => {
                let evicted = self.make_room(state)?;
                state.entries.insert(key.to_owned(), value);
                evicted
            }
        };
        state.policy.touch(key);

        Ok(evicted)
    }

    /// Overwrite or seed a value as a promotion write, replacing any
    /// existing entry. Lookups use [`CacheLevel::promote`] instead.
    ///
    /// In [`PromotionMode::Cold`] the policy is not touched: an existing key
    /// keeps its standing and a new key is admitted as the coldest entry. A new
    /// key arriving at a full level still evicts one victim first.
    pub fn update(&self, key: &str, value: Bytes, mode: PromotionMode) -> Result<Option<String>> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let evicted = match state.entries.get_mut(key) {
            Some(slot) => {
                *slot = value;
                if mode == PromotionMode::Warm {
                    state.policy.touch(key);
                }
                None
            }
            None => {
                let evicted = self.make_room(state)?;
                state.entries.insert(key.to_owned(), value);
                match mode {
                    PromotionMode::Cold => state.policy.admit_cold(key),
                    PromotionMode::Warm => state.policy.touch(key),
                }
                evicted
            }
        };
        self.promotions.fetch_add(1, Ordering::Relaxed);

        Ok(evicted)
    }

    /// Seed a value found at a deeper level.
    ///
    /// Writes only when the key is absent. A key present here was written
    /// after the lookup missed this level, so its value is newer than the one
    /// being promoted and is left alone.
    pub fn promote(&self, key: &str, value: Bytes, mode: PromotionMode) -> Result<Promotion> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.entries.contains_key(key) {
            return Ok(Promotion::Present);
        }

        let evicted = self.make_room(state)?;
        state.entries.insert(key.to_owned(), value);
        match mode {
            PromotionMode::Cold => state.policy.admit_cold(key),
            PromotionMode::Warm => state.policy.touch(key),
        }
        self.promotions.fetch_add(1, Ordering::Relaxed);

        Ok(Promotion::Inserted { evicted })
    }

    /// Evict until a new key fits
    fn make_room(&self, state: &mut LevelState) -> Result<Option<String>> {
        let mut last = None;
        while state.entries.len() >= self.capacity {
            let victim = state
                .policy
                .evict()
                .ok_or(Error::EmptyPolicy { policy: self.kind })?;
            if state.entries.remove(&victim).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %victim, policy = %self.kind, "evicted cache entry");
            }
            last = Some(victim);
        }
        Ok(last)
    }

    /// Presence check without touching the policy
    pub fn contains(&self, key: &str) -> bool {
        self.state.read().entries.contains_key(key)
    }

    /// Key the policy would evict next
    pub fn next_victim(&self) -> Option<String> {
        self.state.read().policy.peek_victim().map(str::to_owned)
    }

    /// Copy of all entries, sorted by key
    pub fn snapshot(&self) -> Vec<(String, Bytes)> {
        let state = self.state.read();
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Drop every entry and its policy record
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.policy.clear();
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if level is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get policy kind
    pub fn policy_kind(&self) -> PolicyKind {
        self.kind
    }

    /// Get hit count
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get miss count
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get hit ratio
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Get eviction count
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get count of promotion writes received
    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }

    /// Get level statistics
    pub fn stats(&self) -> LevelStats {
        LevelStats {
            capacity: self.capacity,
            entries: self.len(),
            policy: self.kind,
            hits: self.hits(),
            misses: self.misses(),
            hit_ratio: self.hit_ratio(),
            evictions: self.evictions(),
            promotions: self.promotions(),
        }
    }
}

impl fmt::Debug for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLevel")
            .field("capacity", &self.capacity)
            .field("policy", &self.kind)
            .field("entries", &self.len())
            .finish()
    }
}

/// Level statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStats {
    /// Capacity in entries
    pub capacity: usize,
    /// Number of entries
    pub entries: usize,
    /// Eviction policy
    pub policy: PolicyKind,
    /// Hit count
    pub hits: u64,
    /// Miss count
    pub misses: u64,
    /// Hit ratio (0.0 - 1.0)
    pub hit_ratio: f64,
    /// Eviction count
    pub evictions: u64,
    /// Promotion writes received
    pub promotions: u64,
}

// =============================================================================
// Tests
// =============================================================================
