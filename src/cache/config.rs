//! Cache Hierarchy Configuration
//!
//! Declarative description of a level stack, loadable from YAML or built from
//! compact `<capacity>:<POLICY>` specs on the command line.
//!
//! ```yaml
//! promotion: cold
//! levels:
//!   - capacity: 3
//!     policy: LRU
//!   - capacity: 2
//!     policy: LFU
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::policy::PolicyKind;
use crate::error::{Error, Result};

/// How promotion writes interact with the receiving level's policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionMode {
    /// Promoted values do not count as accesses. A key already present keeps
    /// its recency/frequency; a newly seeded key is tracked as the coldest
    /// entry of the level.
    #[default]
    Cold,
    /// Promoted values are recorded as a touch on the receiving level
    Warm,
}

impl fmt::Display for PromotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionMode::Cold => write!(f, "cold"),
            PromotionMode::Warm => write!(f, "warm"),
        }
    }
}

impl FromStr for PromotionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cold" => Ok(PromotionMode::Cold),
            "warm" => Ok(PromotionMode::Warm),
            other => Err(Error::Config(format!("unknown promotion mode: {}", other))),
        }
    }
}

/// Configuration of a single level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Maximum number of entries
    pub capacity: usize,
    /// Eviction policy name (`LRU` or `LFU`, case-insensitive)
    pub policy: String,
}

impl LevelConfig {
    /// Create a level configuration
    pub fn new(capacity: usize, policy: impl Into<String>) -> Self {
        Self {
            capacity,
            policy: policy.into(),
        }
    }

    /// Validate the capacity and resolve the policy name
    pub fn validate(&self) -> Result<PolicyKind> {
        if self.capacity == 0 {
            return Err(Error::Config("level capacity must be positive".into()));
        }
        self.policy.parse()
    }
}

impl FromStr for LevelConfig {
    type Err = Error;

    /// Parse `<capacity>:<POLICY>`, e.g. `3:LRU`
    fn from_str(s: &str) -> Result<Self> {
        let (capacity, policy) = s
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("expected <capacity>:<policy>, got '{}'", s)))?;
        let capacity = capacity
            .trim()
            .parse::<usize>()
            .map_err(|e| Error::Config(format!("invalid capacity '{}': {}", capacity, e)))?;
        Ok(Self::new(capacity, policy.trim()))
    }
}

/// Configuration of a whole hierarchy, fastest level first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Levels in lookup order
    pub levels: Vec<LevelConfig>,
    /// Promotion behaviour
    #[serde(default)]
    pub promotion: PromotionMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            levels: vec![LevelConfig::new(3, "LRU"), LevelConfig::new(2, "LFU")],
            promotion: PromotionMode::default(),
        }
    }
}

impl CacheConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Check every level, reporting the first invalid one
    pub fn validate(&self) -> Result<()> {
        for (idx, level) in self.levels.iter().enumerate() {
            level
                .validate()
                .map_err(|e| Error::Config(format!("level {}: {}", idx + 1, e)))?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
