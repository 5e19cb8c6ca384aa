//! Configuration management for VidBox
//!
//! Layered configuration loaded from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file (default: `config/vidbox.toml`)
//! 3. Environment variables (highest priority)
//!
//! Environment overrides use the pattern `VIDBOX__<section>__<key>`, e.g.
//! `VIDBOX__SERVER__BIND_ADDR=0.0.0.0:9000` or
//! `VIDBOX__DOWNLOADER__BINARY_PATH=/usr/local/bin/yt-dlp`.

mod models;
mod sources;
mod validation;

pub use models::{
    CleanupConfig, Config, DownloaderConfig, NotifyConfig, ServerConfig,
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
    /// Returns an error if the configuration file is malformed or
    /// validation fails (out-of-range threshold, zero poll interval, ...).
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
