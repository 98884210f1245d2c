//! Message and tool types exchanged with the language model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition published to the model at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON Schema for parameters
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A finalized tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id echoed back with the tool output
    pub id: String,
    /// Tool name
    pub name: String,
    /// Parsed arguments; `Value::Null` when the payload was not valid JSON
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// User input appended to the model conversation
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    /// Typed text
    Text(String),
    /// Encoded audio clip (mono 16-bit WAV)
    Audio(Vec<u8>),
}

impl UserContent {
    pub fn is_audio(&self) -> bool {
        matches!(self, UserContent::Audio(_))
    }
}
