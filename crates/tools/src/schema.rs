//! Tool schemas and errors
//!
//! Schemas are plain JSON Schema objects so they can be published to the
//! model and validated against with `jsonschema`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use visit_agent_core::ToolDefinition;

/// Builder for a tool's JSON Schema parameters
#[derive(Debug, Clone, Default)]
pub struct ToolBuilder {
    name: String,
    description: String,
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Add a string parameter
    pub fn string(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": "string", "description": description}),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a `YYYY-MM-DD` date parameter
    pub fn date(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({
                "type": "string",
                "format": "date",
                "pattern": "^\\d{4}-\\d{2}-\\d{2}$",
                "description": description,
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add an optional string parameter that may be null
    pub fn nullable_string(mut self, name: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({"type": ["string", "null"], "description": description}),
        );
        self
    }

    pub fn build(self) -> ToolDefinition {
        let parameters = json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        });
        ToolDefinition::new(self.name, self.description, parameters)
    }
}

/// Tool error categories reported back to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidParams,
    NotFound,
    UnknownTool,
    /// Gate refused the call
    PreconditionFailed,
    Timeout,
    Internal,
}

/// Error produced while dispatching a tool call
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTool, format!("Unknown tool: {}", name))
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PreconditionFailed, message)
    }

    pub fn timeout(name: &str, secs: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Tool {} timed out after {}s", name, secs),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// JSON payload fed back to the model as the call's output
    pub fn to_output(&self) -> Value {
        json!({
            "status": "error",
            "code": self.code,
            "message": self.message,
        })
    }
}

impl From<ToolError> for visit_agent_core::Error {
    fn from(err: ToolError) -> Self {
        visit_agent_core::Error::Tool(err.to_string())
    }
}
