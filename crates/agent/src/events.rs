//! Session state and the agent event side channel

use serde::Serialize;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the caller's next turn
    AwaitingInput,
    /// A user turn was sent; draining model turns until a final answer
    AwaitingModel,
}

/// Events broadcast to observers (the UI's tool sidebar, logs)
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// State changed
    StateChanged {
        old: SessionState,
        new: SessionState,
    },
    /// Tool call received from the model
    ToolCall {
        call_id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Tool finished successfully
    ToolResult {
        call_id: String,
        name: String,
        output: serde_json::Value,
    },
    /// Tool failed; the error payload was sent to the model
    ToolError {
        call_id: String,
        name: String,
        error: serde_json::Value,
    },
    /// Upload refused because account or contact is unverified
    GateViolation { call_id: String, name: String },
    /// Final assistant text for the turn
    Response(String),
}

impl AgentEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::StateChanged { .. } => "state_changed",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::ToolError { .. } => "tool_error",
            AgentEvent::GateViolation { .. } => "gate_violation",
            AgentEvent::Response(_) => "response",
        }
    }
}
