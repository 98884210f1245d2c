//! WebRTC voice activity classification

use visit_agent_core::{Result, SpeechClassifier};
use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::PipelineError;

/// Speech / silence classifier backed by WebRTC VAD.
///
/// Accepts 10, 20 or 30 ms frames at 8, 16, 32 or 48 kHz. The underlying
/// detector is not `Send`, so create it on the thread that captures.
pub struct WebRtcClassifier {
    vad: Vad,
    sample_rate: u32,
}

impl WebRtcClassifier {
    /// Create a classifier; `aggressiveness` runs from 0 (permissive) to 3
    pub fn new(sample_rate: u32, aggressiveness: u8) -> std::result::Result<Self, PipelineError> {
        let mode = match aggressiveness {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            3 => VadMode::VeryAggressive,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "VAD aggressiveness must be 0-3, got {}",
                    other
                )))
            },
        };

        let rate = match sample_rate {
            8000 => SampleRate::Rate8kHz,
            16000 => SampleRate::Rate16kHz,
            32000 => SampleRate::Rate32kHz,
            48000 => SampleRate::Rate48kHz,
            other => {
                return Err(PipelineError::Configuration(format!(
                    "WebRTC VAD supports 8000, 16000, 32000 or 48000 Hz, got {}",
                    other
                )))
            },
        };

        tracing::debug!(sample_rate, aggressiveness, "Initialized WebRTC VAD");

        Ok(Self {
            vad: Vad::new_with_rate_and_mode(rate, mode),
            sample_rate,
        })
    }

    fn valid_frame_len(&self, len: usize) -> bool {
        [10usize, 20, 30]
            .iter()
            .any(|ms| self.sample_rate as usize * ms / 1000 == len)
    }
}

impl SpeechClassifier for WebRtcClassifier {
    fn is_speech(&mut self, frame: &[i16], sample_rate: u32) -> Result<bool> {
        if sample_rate != self.sample_rate {
            return Err(PipelineError::Vad(format!(
                "classifier configured for {} Hz, frame is {} Hz",
                self.sample_rate, sample_rate
            ))
            .into());
        }
        if !self.valid_frame_len(frame.len()) {
            return Err(PipelineError::Vad(format!(
                "frame of {} samples is not 10, 20 or 30 ms",
                frame.len()
            ))
            .into());
        }

        self.vad
            .is_voice_segment(frame)
            .map_err(|_| PipelineError::Vad("voice segment classification failed".to_string()).into())
    }
}
