//! Configuration management for ProcLink
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! # Environment Variables
//!
//! `PROCLINK__<section>__<key>`, for example:
//! - `PROCLINK__SERVER__PORT=9000`
//! - `PROCLINK__POOL__WORKER_COUNT=200`
//! - `PROCLINK__EXTRACTOR__BLACKLIST_RANGES="10.0.0.0/8 127.0.0.0/8"`
//!
//! # Configuration File
//!
//! By default the file is `config/proclink.toml`; `PROCLINK_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Config, ExtractorConfig, PoolSettings, ServerConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment) and validate it
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_sources(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::from_sources(Some(path))?;
        config.validate()?;
        Ok(config)
    }

    /// Merge file and environment without validating, for callers that layer
    /// more overrides on top
    pub fn from_sources(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => sources::load_from_sources(path)?,
            None => sources::load()?,
        };
        Ok(config)
    }

    /// Re-run validation, e.g. after command-line overrides
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
