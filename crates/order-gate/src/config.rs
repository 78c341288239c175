//! Configuration for the ordering gate

use crate::domain::tracker::DEFAULT_SHARD_COUNT;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Shard count must be at least 1")]
    ZeroShards,
}

/// Gate configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Number of independently locked tracker shards
    pub shard_count: usize,
    /// Waits longer than this are logged at `warn`. Never a timeout.
    pub slow_wait_warn_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            slow_wait_warn_ms: 1_000,
        }
    }
}

impl GateConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ORDER_GATE_SHARDS`: tracker shard count (default: 64)
    /// - `ORDER_GATE_SLOW_WAIT_MS`: slow wait warning threshold (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            shard_count: parse_var("ORDER_GATE_SHARDS")?.unwrap_or(defaults.shard_count),
            slow_wait_warn_ms: parse_var("ORDER_GATE_SLOW_WAIT_MS")?
                .unwrap_or(defaults.slow_wait_warn_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::ZeroShards);
        }
        Ok(())
    }

    pub fn slow_wait_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_wait_warn_ms)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}
