//! Model integration for the visit report agent
//!
//! Features:
//! - Realtime websocket connection (Azure OpenAI / OpenAI)
//! - Turn aggregation of streamed audio, transcript and tool-call fragments
//! - Session instructions

pub mod aggregator;
pub mod prompt;
pub mod realtime;

pub use aggregator::{drain_turn, TurnAccumulator};
pub use prompt::InstructionsBuilder;
pub use realtime::{decode_server_event, realtime_url, RealtimeConnection};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection closed before the turn completed")]
    ConnectionClosed,

    /// `error` event sent by the model service
    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for LlmError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => LlmError::ConnectionClosed,
            other => LlmError::Connection(other.to_string()),
        }
    }
}

impl From<LlmError> for visit_agent_core::Error {
    fn from(err: LlmError) -> Self {
        visit_agent_core::Error::Model(err.to_string())
    }
}
