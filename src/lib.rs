//! Tiercache - Tiered In-Process Key-Value Cache
//!
//! A sequence of bounded cache levels (level 1 fastest/smallest), each governed
//! by its own eviction policy. Hot values migrate toward level 1 on read.
//!
//! # Example
//!
//! ```
//! use tiercache::{MultilevelCache, PolicyKind};
//!
//! let cache = MultilevelCache::new();
//! cache.add_cache_level(3, PolicyKind::Lru)?;
//! cache.add_cache_level(2, PolicyKind::Lfu)?;
//!
//! cache.put("A", "1")?;
//! let hit = cache.get("A")?;
//! assert_eq!(hit.level, 1);
//! assert_eq!(&hit.value[..], b"1");
//! # Ok::<(), tiercache::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Levels, eviction policies and the multilevel orchestrator
//! - [`error`] - Error types

pub mod cache;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheConfig, CacheHit, CacheLevel, EvictionPolicy, LevelConfig, LevelSnapshot,
    MultilevelCache, PolicyKind, PromotionMode,
};
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
