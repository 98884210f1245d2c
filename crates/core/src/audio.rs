//! Audio types and PCM utilities

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sample rates accepted by the speech classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    Hz8000,
    /// 16kHz - Standard speech capture
    #[default]
    Hz16000,
    /// 24kHz - Realtime model output
    Hz24000,
    Hz32000,
    /// 48kHz - Professional audio
    Hz48000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz24000 => 24000,
            SampleRate::Hz32000 => 32000,
            SampleRate::Hz48000 => 48000,
        }
    }

    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            8000 => Some(SampleRate::Hz8000),
            16000 => Some(SampleRate::Hz16000),
            24000 => Some(SampleRate::Hz24000),
            32000 => Some(SampleRate::Hz32000),
            48000 => Some(SampleRate::Hz48000),
            _ => None,
        }
    }

    /// Number of mono samples covering `ms` milliseconds
    pub fn samples_for_ms(&self, ms: u32) -> usize {
        samples_for_ms(self.as_u32(), ms)
    }
}

/// Number of mono samples covering `ms` milliseconds at `sample_rate`
pub fn samples_for_ms(sample_rate: u32, ms: u32) -> usize {
    (sample_rate as usize * ms as usize) / 1000
}

/// Decode little-endian PCM16 bytes. A trailing odd byte is ignored.
pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples as little-endian PCM16 bytes
pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert a normalized f32 sample to PCM16
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// One end-pointed utterance from the microphone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedAudio {
    /// Mono PCM16 samples, speech and trailing silence in capture order
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Frames read from the source
    pub frames: usize,
    /// Frames the classifier labelled as speech
    pub speech_frames: usize,
    /// Capture hit the maximum duration before the silence timeout
    pub truncated: bool,
}

impl CapturedAudio {
    /// True when no frame was classified as speech
    pub fn is_silent(&self) -> bool {
        self.speech_frames == 0
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}
