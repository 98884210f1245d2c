//! Error types shared across crates
//!
//! Each crate owns a richer error enum and converts into [`Error`] at the
//! trait boundaries defined in [`crate::traits`].

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Microphone or speaker unavailable, or the device stream failed
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio processing error: {0}")]
    Audio(String),

    /// Model connection failed, closed early, or reported an error event
    #[error("Model connection error: {0}")]
    Model(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that originate in audio hardware
    pub fn is_device(&self) -> bool {
        matches!(self, Error::Device(_))
    }
}

/// Result alias using the core [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
