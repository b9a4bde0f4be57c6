//! Property-Based Tests for the Cache Hierarchy
//!
//! # Test Properties
//!
//! 1. **Capacity**: no level ever holds more entries than its capacity
//! 2. **Promotion**: a hit at level n leaves the value in levels 1..n
//! 3. **Write Target**: `put` always lands in level 1
//! 4. **Victim Order**: LRU and LFU agree with straightforward reference models

#![cfg(test)]

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use proptest::prelude::*;

use super::config::PromotionMode;
use super::manager::MultilevelCache;
use super::policy::{EvictionPolicy, LfuPolicy, LruPolicy, PolicyKind};

// =============================================================================
// Property Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum CacheOp {
    Put(u8, u8),
    Get(u8),
}

#[derive(Debug, Clone)]
enum PolicyOp {
    Touch(u8),
    AdmitCold(u8),
    Evict,
}

/// Small key space so evictions and promotions happen often.
fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (0u8..10, any::<u8>()).prop_map(|(k, v)| CacheOp::Put(k, v)),
        (0u8..10).prop_map(CacheOp::Get),
    ]
}

fn policy_op_strategy() -> impl Strategy<Value = PolicyOp> {
    prop_oneof![
        3 => (0u8..8).prop_map(PolicyOp::Touch),
        1 => (0u8..8).prop_map(PolicyOp::AdmitCold),
        1 => Just(PolicyOp::Evict),
    ]
}

fn policy_kind_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![Just(PolicyKind::Lru), Just(PolicyKind::Lfu)]
}

/// 1-4 levels of capacity 1-4.
fn hierarchy_strategy() -> impl Strategy<Value = Vec<(usize, PolicyKind)>> {
    prop::collection::vec((1usize..=4, policy_kind_strategy()), 1..=4)
}

fn promotion_strategy() -> impl Strategy<Value = PromotionMode> {
    prop_oneof![Just(PromotionMode::Cold), Just(PromotionMode::Warm)]
}

fn key(k: u8) -> String {
    format!("k{}", k)
}

fn build(levels: &[(usize, PolicyKind)], mode: PromotionMode) -> MultilevelCache {
    let cache = MultilevelCache::with_promotion(mode);
    for &(capacity, policy) in levels {
        cache.add_cache_level(capacity, policy).unwrap();
    }
    cache
}

// =============================================================================
// Hierarchy Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: every level stays within capacity after every operation.
    #[test]
    fn prop_capacity_never_exceeded(
        levels in hierarchy_strategy(),
        mode in promotion_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..200),
    ) {
        let cache = build(&levels, mode);

        for op in ops {
            match op {
                CacheOp::Put(k, v) => cache.put(&key(k), vec![v])?,
                CacheOp::Get(k) => {
                    let _ = cache.get(&key(k));
                }
            }

            for stats in cache.stats() {
                prop_assert!(stats.entries <= stats.capacity,
                    "level holds {} entries, capacity {}", stats.entries, stats.capacity);
            }
        }
    }

    /// Property: after a hit at level n, levels 1..n all map the key to the returned value.
    #[test]
    fn prop_hit_promotes_to_faster_levels(
        levels in hierarchy_strategy(),
        mode in promotion_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..200),
    ) {
        let cache = build(&levels, mode);

        for op in ops {
            match op {
                CacheOp::Put(k, v) => cache.put(&key(k), vec![v])?,
                CacheOp::Get(k) => {
                    let Ok(hit) = cache.get(&key(k)) else { continue };
                    for n in 1..hit.level {
                        let level = cache.level(n).unwrap();
                        let stored = level
                            .snapshot()
                            .into_iter()
                            .find(|(stored_key, _)| *stored_key == key(k))
                            .map(|(_, value)| value);
                        prop_assert_eq!(stored, Some(hit.value.clone()));
                    }
                }
            }
        }
    }

    /// Property: a put is visible at level 1 regardless of deeper copies.
    #[test]
    fn prop_put_lands_in_level_one(
        levels in hierarchy_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 0..100),
        k in 0u8..10,
        v in any::<u8>(),
    ) {
        let cache = build(&levels, PromotionMode::Cold);
        for op in ops {
            match op {
                CacheOp::Put(k, v) => cache.put(&key(k), vec![v])?,
                CacheOp::Get(k) => {
                    let _ = cache.get(&key(k));
                }
            }
        }

        cache.put(&key(k), vec![v])?;
        prop_assert!(cache.level(1).unwrap().contains(&key(k)));

        let hit = cache.get(&key(k))?;
        prop_assert_eq!(hit.level, 1);
        prop_assert_eq!(hit.value, Bytes::from(vec![v]));
    }
}

// =============================================================================
// Policy Model Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Property: LRU evicts the front of a recency queue.
    #[test]
    fn prop_lru_matches_model(ops in prop::collection::vec(policy_op_strategy(), 1..300)) {
        let mut policy = LruPolicy::new();
        let mut model: VecDeque<String> = VecDeque::new();

        for op in ops {
            match op {
                PolicyOp::Touch(k) => {
                    policy.touch(&key(k));
                    model.retain(|m| *m != key(k));
                    model.push_back(key(k));
                }
                PolicyOp::AdmitCold(k) => {
                    policy.admit_cold(&key(k));
                    if !model.contains(&key(k)) {
                        model.push_front(key(k));
                    }
                }
                PolicyOp::Evict => {
                    prop_assert_eq!(policy.evict(), model.pop_front());
                }
            }
            prop_assert_eq!(policy.len(), model.len());
        }
    }

    /// Property: LFU evicts the minimum (count, last-touch) pair.
    #[test]
    fn prop_lfu_matches_model(ops in prop::collection::vec(policy_op_strategy(), 1..300)) {
        let mut policy = LfuPolicy::new();
        let mut model: HashMap<String, (u64, u64)> = HashMap::new();
        let mut clock = 0u64;

        for op in ops {
            match op {
                PolicyOp::Touch(k) => {
                    policy.touch(&key(k));
                    let entry = model.entry(key(k)).or_insert((0, 0));
                    entry.0 += 1;
                    entry.1 = clock;
                    clock += 1;
                }
                PolicyOp::AdmitCold(k) => {
                    policy.admit_cold(&key(k));
                    if !model.contains_key(&key(k)) {
                        model.insert(key(k), (0, clock));
                        clock += 1;
                    }
                }
                PolicyOp::Evict => {
                    let expected = model
                        .iter()
                        .min_by_key(|(_, rank)| **rank)
                        .map(|(k, _)| k.clone());
                    if let Some(victim) = &expected {
                        model.remove(victim);
                    }
                    prop_assert_eq!(policy.evict(), expected);
                }
            }
            prop_assert_eq!(policy.len(), model.len());
        }
    }
}
