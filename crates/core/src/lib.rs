//! Core traits and types for the visit report agent
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (model connection, audio source/sink, classifier)
//! - Streamed model events and turn results
//! - Message and tool types
//! - Visit report data contract
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod events;
pub mod llm_types;
pub mod traits;
pub mod visit_report;

pub use audio::{
    f32_to_i16, pcm16_from_le_bytes, pcm16_to_le_bytes, samples_for_ms, CapturedAudio, SampleRate,
};
pub use conversation::{ConversationHistory, Turn, TurnRole};
pub use error::{Error, Result};
pub use events::{StreamEvent, TurnResult};
pub use llm_types::{ToolCall, ToolDefinition, UserContent};
pub use traits::{
    AudioSink, AudioSource, EventStream, ModelConnection, SpeechClassifier, UtteranceCapture,
};
pub use visit_report::{visit_report_schema, Division, Location, UploadMode, VisitReport};
