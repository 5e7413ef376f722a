//! Configuration management for platewatch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use platewatch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Polling every {}s", config.pump.poll_interval_secs);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `PLATEWATCH__<section>__<key>`
//!
//! Examples:
//! - `PLATEWATCH__UPSTREAM__BASE_URL=http://sagra-prod:8001/api`
//! - `PLATEWATCH__PUMP__POLL_INTERVAL_SECS=30`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/platewatch.toml`.
//! This can be overridden using the `PLATEWATCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, PumpConfig, UpstreamConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`PLATEWATCH__*`)
    /// 2. TOML file (default: `config/platewatch.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (bad URLs, zero intervals)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
