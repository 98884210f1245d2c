//! Audio pipeline: end-pointed capture and response playback
//!
//! This crate provides:
//! - WebRTC voice activity classification
//! - Trailing-silence end-pointing over any frame source
//! - Microphone capture via cpal
//! - WAV encoding of captured utterances
//! - Padded, blocking playback of streamed response audio

pub mod capture;
pub mod endpointer;
pub mod playback;
pub mod vad;
pub mod wav;

pub use capture::{CpalSource, MicrophoneCapture};
pub use endpointer::{Endpointer, EndpointerConfig};
pub use playback::{PlaybackBuffer, RodioSink};
pub use vad::WebRtcClassifier;
pub use wav::encode_wav;

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("VAD error: {0}")]
    Vad(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Channel closed")]
    ChannelClosed,
}

impl From<hound::Error> for PipelineError {
    fn from(err: hound::Error) -> Self {
        PipelineError::Audio(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for PipelineError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        PipelineError::Device(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for PipelineError {
    fn from(err: cpal::BuildStreamError) -> Self {
        PipelineError::Device(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for PipelineError {
    fn from(err: cpal::PlayStreamError) -> Self {
        PipelineError::Device(err.to_string())
    }
}

impl From<PipelineError> for visit_agent_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Device(msg) => visit_agent_core::Error::Device(msg),
            PipelineError::ChannelClosed => {
                visit_agent_core::Error::Device("audio stream closed".to_string())
            },
            PipelineError::Configuration(msg) => visit_agent_core::Error::Config(msg),
            PipelineError::Vad(msg) | PipelineError::Audio(msg) => {
                visit_agent_core::Error::Audio(msg)
            },
        }
    }
}
