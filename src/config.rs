// Construction-time configuration for buffers and the aggregator.
//
// Nothing here is runtime-mutable: a config is read once when the
// aggregator and its buffers are built.

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of sample slots per buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Default bound on tracked operation names
pub const DEFAULT_MAX_PROFILES: usize = 10_000;

/// Collector configuration
///
/// Missing keys fall back to their defaults, so a TOML file only needs the
/// values it overrides.
///
/// # Example
/// ```
/// use perfbatch::config::CollectorConfig;
///
/// let config = CollectorConfig::from_toml_str("buffer_capacity = 64").unwrap();
/// assert_eq!(config.buffer_capacity, 64);
/// assert_eq!(config.max_profiles, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Samples held per thread before a flush is needed
    pub buffer_capacity: usize,

    /// Operation names tracked before LRU eviction kicks in
    pub max_profiles: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_profiles: DEFAULT_MAX_PROFILES,
        }
    }
}

impl CollectorConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_max_profiles(mut self, max_profiles: usize) -> Self {
        self.max_profiles = max_profiles;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(CollectorError::InvalidConfig(
                "buffer_capacity must be > 0".to_string(),
            ));
        }
        if self.max_profiles == 0 {
            return Err(CollectorError::InvalidConfig(
                "max_profiles must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CollectorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
