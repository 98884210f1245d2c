//! Visit report agent
//!
//! Features:
//! - Session orchestration over a streaming, tool-using model
//! - Validation-gated tool dispatch (account and contact before upload)
//! - Voice turns with end-pointed capture and spoken responses
//! - Event side channel for UIs and logs

pub mod events;
pub mod gate;
pub mod session;

pub use events::{AgentEvent, SessionState};
pub use gate::{ToolGate, ToolOutcome, ValidationState};
pub use session::{InputMode, UserInput, VisitSession};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    /// Bad input mode or empty text; raised before the model is contacted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Microphone or speaker failure; text turns keep working
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<visit_agent_core::Error> for AgentError {
    fn from(err: visit_agent_core::Error) -> Self {
        use visit_agent_core::Error;
        match err {
            Error::Device(msg) => AgentError::Device(msg),
            Error::Model(msg) => AgentError::Model(msg),
            Error::Tool(msg) | Error::Integration(msg) => AgentError::Tool(msg),
            Error::Config(msg) => AgentError::Config(msg),
            Error::InvalidInput(msg) => AgentError::InvalidInput(msg),
            other => AgentError::Internal(other.to_string()),
        }
    }
}

impl From<visit_agent_llm::LlmError> for AgentError {
    fn from(err: visit_agent_llm::LlmError) -> Self {
        AgentError::Model(err.to_string())
    }
}

impl From<visit_agent_pipeline::PipelineError> for AgentError {
    fn from(err: visit_agent_pipeline::PipelineError) -> Self {
        visit_agent_core::Error::from(err).into()
    }
}

impl From<visit_agent_config::ConfigError> for AgentError {
    fn from(err: visit_agent_config::ConfigError) -> Self {
        AgentError::Config(err.to_string())
    }
}
