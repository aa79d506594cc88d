// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controller configuration.
//!
//! Ports are a CLI contract (`main.rs`); everything else here is a tunable
//! with a spec-mandated default, loadable from a JSON file for advanced
//! deployments.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Number of replicas per fragment (fewer if the cluster has fewer
    /// live nodes).
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,

    /// Expected cadence of storage-node heartbeats, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// A node missing this many seconds of heartbeats is considered stale.
    #[serde(default = "default_accepted_delay_secs")]
    pub accepted_delay_secs: u64,

    /// Fallback fragment size when a PUT request does not specify one.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: u64,

    /// Maximum wire message size, shared with `dfs_proto::frame`.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_replication_factor() -> usize {
    3
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

fn default_accepted_delay_secs() -> u64 {
    15
}

fn default_chunk_size() -> u64 {
    128 * 1024 * 1024
}

fn default_max_message_size() -> usize {
    16 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            replication_factor: default_replication_factor(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            accepted_delay_secs: default_accepted_delay_secs(),
            default_chunk_size: default_chunk_size(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn accepted_delay(&self) -> Duration {
        Duration::from_secs(self.accepted_delay_secs)
    }

    /// Index rebuild cadence: `HEARTBEAT_INTERVAL * ACCEPTED_DELAY`.
    pub fn index_rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs * self.accepted_delay_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replication_factor == 0 {
            return Err(ConfigError::InvalidValue(
                "replication_factor cannot be 0".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "heartbeat_interval_secs cannot be 0".into(),
            ));
        }
        if self.accepted_delay_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::InvalidValue(
                "accepted_delay_secs must exceed heartbeat_interval_secs".into(),
            ));
        }
        if self.default_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "default_chunk_size cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {s}"),
            Self::Parse(s) => write!(f, "parse error: {s}"),
            Self::Serialize(s) => write!(f, "serialize error: {s}"),
            Self::InvalidValue(s) => write!(f, "invalid value: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.accepted_delay_secs, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ServerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.replication_factor, parsed.replication_factor);
    }

    #[test]
    fn rejects_accepted_delay_not_exceeding_heartbeat() {
        let config = ServerConfig {
            heartbeat_interval_secs: 10,
            accepted_delay_secs: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_replication_factor() {
        let config = ServerConfig {
            replication_factor: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn index_rebuild_interval_matches_spec_formula() {
        let config = ServerConfig::default();
        assert_eq!(config.index_rebuild_interval(), Duration::from_secs(75));
    }
}
