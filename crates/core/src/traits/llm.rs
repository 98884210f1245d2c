//! Model connection trait

use crate::{Result, StreamEvent, ToolDefinition, UserContent};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Ordered feed of events for the current turn
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send + 'a>>;

/// Bidirectional channel to a streaming, tool-using model
///
/// Implementations:
/// - `RealtimeConnection` - realtime websocket API (Azure OpenAI / OpenAI)
///
/// Each `append_*` and `trigger_generation` call returns once the item
/// has been accepted by the connection.
#[async_trait]
pub trait ModelConnection: Send {
    /// One-time session setup with instructions and published tools
    async fn configure(&mut self, instructions: &str, tools: &[ToolDefinition]) -> Result<()>;

    /// Append a user message to the conversation
    async fn append_user_message(&mut self, content: UserContent) -> Result<()>;

    /// Append the output of a tool call, correlated by `call_id`
    async fn append_tool_output(&mut self, call_id: &str, output: &str) -> Result<()>;

    /// Ask the model to produce the next turn
    async fn trigger_generation(&mut self) -> Result<()>;

    /// Events of the turn in progress
    ///
    /// The stream ends after `TurnComplete`; calling again continues with
    /// the next turn's events.
    fn events(&mut self) -> EventStream<'_>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
