//! Streamed model events and per-turn results

use crate::llm_types::ToolCall;

/// One unit of the model's event feed.
///
/// Events for a single turn arrive in order; `TurnComplete` is always last.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Decoded PCM16 bytes of the spoken response
    AudioFragment(Vec<u8>),
    /// Full transcript of the spoken response
    TranscriptComplete(String),
    /// Partial tool-call argument JSON
    ToolArgsFragment { call_id: String, delta: String },
    /// Tool name for a call, sent once its arguments are complete
    ToolNameResolved { call_id: String, name: String },
    /// End of the turn
    TurnComplete,
    /// Error reported by the model service
    ServerError { message: String },
}

impl StreamEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::AudioFragment(_) => "audio_fragment",
            StreamEvent::TranscriptComplete(_) => "transcript_complete",
            StreamEvent::ToolArgsFragment { .. } => "tool_args_fragment",
            StreamEvent::ToolNameResolved { .. } => "tool_name_resolved",
            StreamEvent::TurnComplete => "turn_complete",
            StreamEvent::ServerError { .. } => "server_error",
        }
    }
}

/// Outcome of draining one model turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    /// The model wants tools executed before it answers
    ToolBatch(Vec<ToolCall>),
    /// The model answered the user
    FinalUtterance {
        text: String,
        /// Concatenated PCM16 response audio, possibly empty
        audio: Vec<u8>,
    },
}

impl TurnResult {
    pub fn is_tool_batch(&self) -> bool {
        matches!(self, TurnResult::ToolBatch(_))
    }
}
