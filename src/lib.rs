//! nvsmi2ha - nvidia-smi to MQTT bridge library
//!
//! This library provides the core functionality for streaming NVIDIA GPU
//! metrics from `nvidia-smi dmon` to an MQTT broker, with Home Assistant
//! discovery and availability tracking.
//!
//! # Modules
//!
//! - [`broker`]: MQTT session abstraction layer
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Domain models
//! - [`error`]: Error types
//! - [`services`]: Discovery and publish loop
//! - [`smi`]: nvidia-smi abstraction layer and parsers

pub mod broker;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod smi;

#[cfg(test)]
pub mod mock;

pub use error::{AppError, Result};
