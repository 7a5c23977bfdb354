//! Configuration module for the cluster driver
//!
//! Supports loading configuration from a TOML file.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use clus::ClusterOpsConfig;

/// Driver configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Hyper-V settings
    #[serde(default)]
    pub hyperv: HyperVConfig,

    /// Failover cluster settings
    #[serde(default)]
    pub hyperv_cluster: ClusterConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hyper-V configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HyperVConfig {
    /// Attach a config drive to every instance (default: false)
    #[serde(default)]
    pub force_config_drive: bool,
}

/// Failover cluster configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Seconds between failover event checks (default: 2)
    #[serde(default = "default_event_check_interval")]
    pub cluster_event_check_interval: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level filter (default: "hyperv_cluster_driver=info,clus=info,hyperv_storage=info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_event_check_interval() -> u64 {
    2
}

fn default_log_level() -> String {
    "hyperv_cluster_driver=info,clus=info,hyperv_storage=info".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_event_check_interval: default_event_check_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e.to_string()))
    }

    /// Pause between failover monitor polls
    pub fn event_check_interval(&self) -> Duration {
        Duration::from_secs(self.hyperv_cluster.cluster_event_check_interval)
    }

    /// Settings for the failover reconciler
    pub fn cluster_ops_config(&self) -> ClusterOpsConfig {
        ClusterOpsConfig {
            event_check_interval: self.event_check_interval(),
        }
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String, String),
    ParseError(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path, err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path, err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
