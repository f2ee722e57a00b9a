//! Configuration system
//!
//! Handles TOML config file parsing and CLI/environment argument merging.
//! The result is validated once at startup and passed by reference to
//! everything that needs broker coordinates or tool settings.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// dmon metric groups accepted by `-s`
const METRIC_GROUPS: &str = "pucvmet";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// MQTT broker settings
    pub broker: BrokerConfig,
    /// nvidia-smi settings
    pub smi: SmiConfig,
    /// Topic layout
    pub topics: TopicConfig,
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Username, if the broker requires authentication
    pub username: Option<String>,
    /// Password for `username`
    pub password: Option<String>,
    /// MQTT client identifier
    pub client_id: String,
    /// Keep-alive interval in seconds
    pub keep_alive_seconds: u64,
    /// How long to wait for the broker to accept the connection
    pub connect_timeout_seconds: u64,
    /// Outgoing request queue capacity
    pub queue_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "nvidia-ha-reporter".to_string(),
            keep_alive_seconds: 30,
            connect_timeout_seconds: 10,
            queue_capacity: 64,
        }
    }
}

impl BrokerConfig {
    /// `host:port` for log messages
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Keep-alive as a duration
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// nvidia-smi configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmiConfig {
    /// Executable name or path
    pub path: String,
    /// dmon metric groups (`-s`)
    pub metrics: String,
    /// Sampling interval in seconds (`-d`); tool default when unset
    pub interval_seconds: Option<u32>,
}

impl Default for SmiConfig {
    fn default() -> Self {
        Self {
            path: "nvidia-smi".to_string(),
            metrics: METRIC_GROUPS.to_string(),
            interval_seconds: None,
        }
    }
}

/// Topic layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Prefix for state and availability topics
    pub base: String,
    /// Home Assistant discovery prefix
    pub discovery_prefix: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            base: "nvidia-smi".to_string(),
            discovery_prefix: "homeassistant".to_string(),
        }
    }
}

impl Config {
    /// Check every value the bridge relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let broker = &self.broker;
        if broker.host.trim().is_empty() {
            return Err(ConfigError::invalid("broker.host", "must not be empty"));
        }
        if broker.port == 0 {
            return Err(ConfigError::invalid("broker.port", "must be non-zero"));
        }
        if broker.client_id.trim().is_empty() {
            return Err(ConfigError::invalid("broker.client_id", "must not be empty"));
        }
        if broker.password.is_some() && broker.username.is_none() {
            return Err(ConfigError::invalid(
                "broker.password",
                "a password requires a username",
            ));
        }
        if broker.keep_alive_seconds < 5 {
            return Err(ConfigError::invalid(
                "broker.keep_alive_seconds",
                "must be at least 5",
            ));
        }
        if broker.connect_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "broker.connect_timeout_seconds",
                "must be at least 1",
            ));
        }
        if broker.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "broker.queue_capacity",
                "must be at least 1",
            ));
        }

        if self.smi.path.trim().is_empty() {
            return Err(ConfigError::invalid("smi.path", "must not be empty"));
        }
        let metrics = &self.smi.metrics;
        if metrics.is_empty() || !metrics.chars().all(|c| METRIC_GROUPS.contains(c)) {
            return Err(ConfigError::invalid(
                "smi.metrics",
                format!("must be a non-empty subset of '{}'", METRIC_GROUPS),
            ));
        }
        if self.smi.interval_seconds == Some(0) {
            return Err(ConfigError::invalid("smi.interval_seconds", "must be at least 1"));
        }

        validate_topic("topics.base", &self.topics.base)?;
        validate_topic("topics.discovery_prefix", &self.topics.discovery_prefix)?;

        Ok(())
    }
}

fn validate_topic(key: &str, topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::invalid(key, "must not be empty"));
    }
    if topic.contains(['+', '#']) {
        return Err(ConfigError::invalid(key, "must not contain MQTT wildcards"));
    }
    if topic.starts_with('/') || topic.ends_with('/') {
        return Err(ConfigError::invalid(key, "must not start or end with '/'"));
    }
    Ok(())
}
