//! Multilevel Cache System
//!
//! A stack of bounded levels, each with its own eviction policy. Writes land
//! in level 1; reads cascade downward and promote hits back up.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                         MultilevelCache                                  │
//! │              RwLock<Vec<Arc<CacheLevel>>> (structure only)               │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │  Level 1             │ Level 2             │ ...  │ Level n              │
//! │  ┌────────────────┐  │ ┌────────────────┐  │      │ ┌────────────────┐   │
//! │  │ HashMap + LRU  │  │ │ HashMap + LFU  │  │      │ │ HashMap + ...  │   │
//! │  │ capacity: 3    │  │ │ capacity: 2    │  │      │ │ capacity: c    │   │
//! │  └────────────────┘  │ └────────────────┘  │      │ └────────────────┘   │
//! │          ▲           │          │          │      │          │           │
//! │          └───────────┴──────────┴──────────┴──────┴──────────┘           │
//! │                         promotion on read hit                            │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Semantics
//!
//! - `put` writes to level 1 only; deeper copies may go stale but are never
//!   returned while level 1 holds the key
//! - `get` returns the first hit and copies it into every faster level that
//!   does not already hold the key
//! - promotion writes follow [`PromotionMode`]

mod config;
mod level;
mod manager;
mod metrics;
mod policy;
#[cfg(test)]
mod proptest;

pub use config::{CacheConfig, LevelConfig, PromotionMode};
pub use level::{CacheLevel, LevelStats, Promotion};
pub use manager::{CacheHit, LevelSnapshot, MultilevelCache};
pub use metrics::{CacheMetrics, LatencyTracker, MetricsSnapshot};
pub use policy::{EvictionPolicy, LfuPolicy, LruPolicy, PolicyKind};

// =============================================================================
// Tests
// =============================================================================
