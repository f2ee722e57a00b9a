//! Topic layout
//!
//! All topic strings the bridge publishes or subscribes to.

use crate::config::TopicConfig;

/// Topic names derived from the configured prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
    discovery_prefix: String,
}

impl Topics {
    /// Create from explicit prefixes
    pub fn new(base: impl Into<String>, discovery_prefix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            discovery_prefix: discovery_prefix.into(),
        }
    }

    /// Retained liveness flag, e.g. `nvidia-smi/availability`
    pub fn availability(&self) -> String {
        format!("{}/availability", self.base)
    }

    /// Per-GPU metric payloads, e.g. `nvidia-smi/GPU-...`
    pub fn state(&self, uuid: &str) -> String {
        format!("{}/{}", self.base, uuid)
    }

    /// Discovery document for one sensor
    pub fn discovery_config(&self, uuid: &str, key: &str) -> String {
        format!("{}/sensor/{}_{}/config", self.discovery_prefix, uuid, key)
    }

    /// Home Assistant birth/last-will topic
    pub fn ha_status(&self) -> String {
        format!("{}/status", self.discovery_prefix)
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::from(&TopicConfig::default())
    }
}

impl From<&TopicConfig> for Topics {
    fn from(config: &TopicConfig) -> Self {
        Self::new(&config.base, &config.discovery_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topics() {
        let topics = Topics::default();
        assert_eq!(topics.availability(), "nvidia-smi/availability");
        assert_eq!(topics.state("GPU-abc"), "nvidia-smi/GPU-abc");
        assert_eq!(
            topics.discovery_config("GPU-abc", "pwr"),
            "homeassistant/sensor/GPU-abc_pwr/config"
        );
        assert_eq!(topics.ha_status(), "homeassistant/status");
    }

    #[test]
    fn test_custom_prefixes() {
        let topics = Topics::new("lab/gpus", "ha");
        assert_eq!(topics.availability(), "lab/gpus/availability");
        assert_eq!(topics.ha_status(), "ha/status");
    }
}
