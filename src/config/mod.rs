//! Configuration management for twsecure
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use twsecure::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Retry budget per item: {}", config.queue.max_retries);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `TWSECURE__<section>__<key>`
//!
//! Examples:
//! - `TWSECURE__QUEUE__MAX_RETRIES=5`
//! - `TWSECURE__MONITOR__DELTA_UNIT=hours`
//! - `TWSECURE__NOTIFIER__TRANSACTIONS_TABLE=tw-transactions`
//!
//! Phone numbers come only from `SMS_FROM_NUMBER` and `SEND_SMS_TO_PHONE_NUMBER`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/twsecure.toml`.
//! This can be overridden using the `TWSECURE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, MonitorConfig, NotifierConfig, QueueConfig, Secrets, TelemetryConfig,
};
pub use validation::ValidationError;

use chrono::TimeDelta;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Resolved and validated configuration for this process
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Same as [`Config::load`] with an explicit file and no phone numbers
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

impl MonitorConfig {
    /// Lookback window for fetching statements (24 hours unless configured)
    pub fn lookback(&self) -> TimeDelta {
        self.delta_unit
            .zip(self.delta_value)
            .and_then(|(unit, value)| unit.duration(value))
            .unwrap_or_else(|| TimeDelta::hours(24))
    }
}
