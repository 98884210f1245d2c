//! Turn aggregation
//!
//! Folds the ordered event feed of one model turn into a single
//! [`TurnResult`]. Tool-call argument fragments are buffered per `call_id`
//! in arrival order; calls keep the order in which they were first seen.
//! If any call carries arguments the turn is a tool batch, even when a
//! transcript also arrived.

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use serde_json::Value;

use visit_agent_core::{Result, StreamEvent, ToolCall, TurnResult};

use crate::LlmError;

#[derive(Debug)]
struct PendingToolCall {
    call_id: String,
    name: Option<String>,
    argument_fragments: Vec<String>,
}

impl PendingToolCall {
    fn new(call_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            name: None,
            argument_fragments: Vec::new(),
        }
    }

    fn has_arguments(&self) -> bool {
        self.argument_fragments.iter().any(|f| !f.is_empty())
    }

    fn finalize(self) -> Option<ToolCall> {
        let Some(name) = self.name else {
            tracing::warn!(
                call_id = %self.call_id,
                "Dropping tool call whose name never resolved"
            );
            return None;
        };

        let raw = self.argument_fragments.concat();
        let arguments = if raw.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        call_id = %self.call_id,
                        tool = %name,
                        error = %e,
                        "Tool arguments are not valid JSON"
                    );
                    Value::Null
                },
            }
        };

        Some(ToolCall::new(self.call_id, name, arguments))
    }
}

/// Accumulates the events of a single turn
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    audio: Vec<u8>,
    text: Option<String>,
    pending: Vec<PendingToolCall>,
    index: HashMap<String, usize>,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending_mut(&mut self, call_id: &str) -> &mut PendingToolCall {
        let idx = match self.index.get(call_id) {
            Some(idx) => *idx,
            None => {
                self.pending.push(PendingToolCall::new(call_id));
                let idx = self.pending.len() - 1;
                self.index.insert(call_id.to_string(), idx);
                idx
            },
        };
        &mut self.pending[idx]
    }

    /// Apply one event; returns true once the turn is complete
    pub fn push(&mut self, event: StreamEvent) -> std::result::Result<bool, LlmError> {
        match event {
            StreamEvent::AudioFragment(bytes) => self.audio.extend_from_slice(&bytes),
            StreamEvent::TranscriptComplete(text) => {
                if self.text.is_some() {
                    tracing::debug!("Second transcript in one turn, keeping the latest");
                }
                self.text = Some(text.trim().to_string());
            },
            StreamEvent::ToolArgsFragment { call_id, delta } => {
                self.pending_mut(&call_id).argument_fragments.push(delta);
            },
            StreamEvent::ToolNameResolved { call_id, name } => {
                self.pending_mut(&call_id).name = Some(name);
            },
            StreamEvent::TurnComplete => return Ok(true),
            StreamEvent::ServerError { message } => return Err(LlmError::Server(message)),
        }
        Ok(false)
    }

    /// Finalize into exactly one result
    pub fn finish(self) -> TurnResult {
        if self.pending.iter().any(PendingToolCall::has_arguments) {
            if self.text.is_some() {
                tracing::debug!("Turn carried both a transcript and tool calls; dispatching tools");
            }
            let calls = self
                .pending
                .into_iter()
                .filter_map(PendingToolCall::finalize)
                .collect();
            return TurnResult::ToolBatch(calls);
        }

        for call in &self.pending {
            tracing::warn!(call_id = %call.call_id, "Ignoring tool call without arguments");
        }

        TurnResult::FinalUtterance {
            text: self.text.unwrap_or_default(),
            audio: self.audio,
        }
    }
}

/// Consume events until `TurnComplete` and return the turn's result.
///
/// Events after `TurnComplete` are left in the stream. A stream that ends
/// before `TurnComplete` is an error, as is a server error event.
pub async fn drain_turn<S>(events: S) -> Result<TurnResult>
where
    S: Stream<Item = Result<StreamEvent>>,
{
    futures::pin_mut!(events);
    let mut turn = TurnAccumulator::new();

    while let Some(event) = events.next().await {
        let event = event?;
        tracing::trace!(kind = event.kind(), "Stream event");
        if turn.push(event)? {
            return Ok(turn.finish());
        }
    }

    Err(LlmError::ConnectionClosed.into())
}
