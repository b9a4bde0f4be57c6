//! Error types for the tiered cache

use thiserror::Error;

use crate::cache::PolicyKind;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or using the cache hierarchy
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (unknown policy kind, zero capacity, bad level spec)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Level number outside `[1, count]`
    #[error("Cache level {level} out of range (have {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },

    /// Key absent from every level
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Lookup or insert issued before any level was added
    #[error("Cache hierarchy has no levels")]
    NoLevels,

    /// A full level asked its policy for a victim but nothing was tracked
    #[error("{policy} eviction policy tracks no keys")]
    EmptyPolicy { policy: PolicyKind },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse error
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True for a lookup miss, so callers can treat it as an ordinary outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
