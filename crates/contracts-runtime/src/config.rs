//! Configuration for contracts-runtime.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading or checking a runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Timeout configuration
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Parallel rule evaluation
    #[serde(default)]
    pub parallel: ParallelConfig,

    /// Result cache
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            parallel: ParallelConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from YAML. Missing sections take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject settings the orchestrator cannot run with.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.timeouts.validation.is_zero() {
            return Err(ConfigError::Invalid(
                "timeouts.validation must be greater than zero".to_string(),
            ));
        }
        if self.parallel.enabled && self.parallel.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "parallel.max_workers must be at least 1".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Upper bound on one validation call
    #[serde(with = "humantime_serde", default = "default_validation_timeout")]
    pub validation: Duration,
}

fn default_validation_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            validation: default_validation_timeout(),
        }
    }
}

/// Parallel rule evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Fan rules out to the blocking pool
    #[serde(default)]
    pub enabled: bool,

    /// Maximum rules evaluated at once
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    4
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_workers: default_max_workers(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    #[serde(default)]
    pub enabled: bool,

    /// Cache TTL
    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub ttl: Duration,

    /// Maximum cache entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_max_entries() -> usize {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: default_cache_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

// Custom serialization for Duration using humantime format
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
