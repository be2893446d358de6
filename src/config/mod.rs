//! # Configuration Management Module
//!
//! Centralized configuration for the meshstat daemon: device identity,
//! reporting intervals, optional subsystems, and the web surface, with
//! validation and sensible defaults.
//!
//! ## Configuration Structure
//!
//! - [`NodeConfig`] - device identity (hostname, ip, node/parent id, role)
//! - [`ReportingConfig`] - periodic task intervals
//! - [`SensorConfig`] - optional temperature probe
//! - [`WebConfig`] - HTTP report surface
//! - [`LoggingConfig`] - logging settings
//!
//! ## Configuration File Format
//!
//! ```toml
//! [node]
//! hostname = "relay-a1"
//! ip = "192.168.1.40"
//! node_id = 25
//! parent_id = 0
//! role = "repeater"
//! power_level = "low"
//!
//! [reporting]
//! arc_interval_secs = 3600
//! keep_alive_interval_secs = 300
//! temperature_interval_secs = 1800
//! indicator_interval_ms = 50
//!
//! [sensor]
//! enabled = false
//!
//! [web]
//! enabled = true
//! bind = "0.0.0.0:8080"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::stats::PeerId;

/// Operating role of the node; selects the report document variant and
/// which counters the transport feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Repeater,
    Gateway,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub hostname: String,
    pub ip: String,
    pub node_id: PeerId,
    pub parent_id: PeerId,
    pub role: NodeRole,
    pub power_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Minimum time between ARC digest emissions.
    pub arc_interval_secs: u64,
    /// Time between keep-alive messages.
    pub keep_alive_interval_secs: u64,
    /// Time between temperature polls (when the sensor is enabled).
    pub temperature_interval_secs: u64,
    /// Status indicator duty-cycle evaluation period.
    pub indicator_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub reporting: ReportingConfig,
    pub sensor: SensorConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.reporting.arc_interval_secs == 0 {
            return Err(anyhow!("reporting.arc_interval_secs must be > 0"));
        }
        if self.reporting.keep_alive_interval_secs == 0 {
            return Err(anyhow!("reporting.keep_alive_interval_secs must be > 0"));
        }
        if self.reporting.temperature_interval_secs == 0 {
            return Err(anyhow!("reporting.temperature_interval_secs must be > 0"));
        }
        if self.web.enabled && self.web.bind.is_empty() {
            return Err(anyhow!("web.bind must be set when the web surface is enabled"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            node: NodeConfig {
                hostname: "meshstat-node".to_string(),
                ip: "0.0.0.0".to_string(),
                node_id: 25,
                parent_id: 0,
                role: NodeRole::Repeater,
                power_level: "low".to_string(),
            },
            reporting: ReportingConfig {
                arc_interval_secs: 3600,
                keep_alive_interval_secs: 300,
                temperature_interval_secs: 1800,
                indicator_interval_ms: 50,
            },
            sensor: SensorConfig { enabled: false },
            web: WebConfig { enabled: true, bind: "0.0.0.0:8080".to_string() },
            logging: LoggingConfig { level: "info".to_string(), file: None },
        }
    }
}
