//! Configuration management for the visit report agent
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (VISIT_AGENT__ prefix, `__` separator)

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AgentConfig, AudioConfig, ObservabilityConfig,
    PlaybackConfig, RealtimeConfig, RealtimeProvider, RuntimeEnvironment, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for visit_agent_core::Error {
    fn from(err: ConfigError) -> Self {
        visit_agent_core::Error::Config(err.to_string())
    }
}
