//! Unified error types for nvsmi2ha
//!
//! This module defines all error types used throughout the application.
//! Uses thiserror for ergonomic error definitions.

use std::time::Duration;

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from the nvidia-smi diagnostic tool
    #[error("nvidia-smi error: {0}")]
    Smi(#[from] SmiError),

    /// Error from the MQTT broker session
    #[error("MQTT error: {0}")]
    Broker(#[from] BrokerError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The metric stream could not establish its schema
    #[error("Metric stream error: {0}")]
    Stream(#[from] StreamError),

    /// No GPUs listed in the inventory
    #[error("No NVIDIA GPUs detected")]
    NoGpusFound,

    /// Signal handler could not be installed
    #[error("Failed to install signal handler: {0}")]
    Signal(String),

    /// IO error (stdout, file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from invoking nvidia-smi
#[derive(Error, Debug)]
pub enum SmiError {
    /// The executable could not be resolved
    #[error("'{0}' not found. Is the NVIDIA driver installed and on PATH?")]
    NotFound(String),

    /// A one-shot query exited unsuccessfully or could not run
    #[error("'{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// The sampling subprocess could not be launched
    #[error("Failed to start '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    /// Stopping the sampling subprocess failed
    #[error("Failed to stop nvidia-smi: {0}")]
    StopFailed(#[source] std::io::Error),
}

/// Errors from the MQTT session
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The broker rejected or never answered the connection
    #[error("Failed to connect to {address}: {message}")]
    ConnectionFailed { address: String, message: String },

    /// No CONNACK within the configured timeout
    #[error("Timed out after {0:?} waiting for the broker to accept the connection")]
    ConnectTimeout(Duration),

    /// The background network loop could not be started or stopped
    #[error("MQTT network loop failed: {0}")]
    NetworkLoop(String),

    /// A publish request could not be queued
    #[error("Failed to publish to '{topic}': {message}")]
    Publish { topic: String, message: String },

    /// The disconnect request could not be queued
    #[error("Failed to disconnect: {0}")]
    Disconnect(String),

    /// A payload could not be serialized
    #[error("Payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that prevent a monitoring session from starting
#[derive(Error, Debug)]
pub enum StreamError {
    /// The stream ended before the header line was read
    #[error("Stream ended before the {0} header line")]
    MissingHeader(&'static str),

    /// Labels and units do not line up
    #[error("Header has {labels} labels but {units} units")]
    SchemaMismatch { labels: usize, units: usize },

    /// Reading the header failed
    #[error("Failed to read header: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors confined to a single data row
///
/// These are logged by the publish loop and never end it.
#[derive(Error, Debug)]
pub enum RowError {
    /// Field count differs from the header
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// The schema has no `gpu` column to route by
    #[error("row has no 'gpu' column")]
    MissingGpuColumn,

    /// The row names a GPU index absent from the inventory
    #[error("unknown GPU index '{0}'")]
    UnknownGpu(String),

    /// The row could not be read from the stream
    #[error("unreadable line: {0}")]
    Read(#[from] std::io::Error),

    /// Publishing the row failed
    #[error("publish failed: {0}")]
    Broker(#[from] BrokerError),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
