//! Configuration management for clipscout
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use clipscout::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `CLIPSCOUT__<section>__<key>`
//!
//! Examples:
//! - `CLIPSCOUT__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `CLIPSCOUT__RESOLVER__BASE_URL=http://localhost:9000/`
//! - `CLIPSCOUT__RESOLVER__RATE_LIMIT_DELAY=30s`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/clipscout.toml`.
//! This can be overridden using the `CLIPSCOUT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{
    Config, DiscoveryConfig, ExtractorConfig, FetchConfig, ResolverConfig, ServerConfig,
};
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
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[discovery]\nbatch_size = 10\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.discovery.batch_size, 10);
        assert_eq!(config.discovery.max_retries, 10);
    }

    #[test]
    fn test_validation_runs_after_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[discovery]\nmax_retries = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::ZeroValue { .. })
        ));
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/clipscout.toml");

        let config = Config::load_from_path(path).unwrap();
        assert_eq!(config.server.max_payload_bytes, ByteSize(64 * 1024));
        assert_eq!(config.resolver.rate_limit_delay, HumanDuration::from_secs(10));
        assert_eq!(config.discovery.stall_jitter, HumanDuration::from_secs(3));
    }

    #[test]
    fn test_malformed_value_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[resolver]\nrate_limit_delay = \"soon\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::LoadError(_)));
    }
}
