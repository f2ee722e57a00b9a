//! Configuration builder
//!
//! Merges configuration from files and CLI arguments (which clap also
//! fills from the environment).

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// An explicitly named file must load; default locations are optional.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with broker host
    pub fn with_host(mut self, host: Option<String>) -> Self {
        if let Some(h) = host {
            self.config.broker.host = h;
        }
        self
    }

    /// Override with broker port
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(p) = port {
            self.config.broker.port = p;
        }
        self
    }

    /// Override with broker credentials
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        if let Some(u) = username {
            self.config.broker.username = Some(u);
        }
        if let Some(p) = password {
            self.config.broker.password = Some(p);
        }
        self
    }

    /// Override with MQTT client identifier
    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        if let Some(id) = client_id {
            self.config.broker.client_id = id;
        }
        self
    }

    /// Override with nvidia-smi path
    pub fn with_smi_path(mut self, path: Option<String>) -> Self {
        if let Some(p) = path {
            self.config.smi.path = p;
        }
        self
    }

    /// Override with dmon sampling interval
    pub fn with_interval(mut self, interval: Option<u32>) -> Self {
        if let Some(i) = interval {
            self.config.smi.interval_seconds = Some(i);
        }
        self
    }

    /// Validate and build the final configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
