//! Trailing-silence end-pointing
//!
//! Frames are read and classified one at a time. A silence counter resets
//! on every speech frame and capture stops once it reaches
//! `silence_timeout / frame_duration`. Leading silence counts toward the
//! same limit, so a speaker who never starts produces a silent clip after
//! one timeout instead of an error. Capture is truncated at
//! `max_capture_ms` if speech never stops.

use visit_agent_config::AudioConfig;
use visit_agent_core::{samples_for_ms, AudioSource, CapturedAudio, Result, SpeechClassifier};

/// End-pointing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointerConfig {
    pub sample_rate: u32,
    pub frame_duration_ms: u32,
    pub silence_timeout_ms: u32,
    pub max_capture_ms: u32,
}

impl Default for EndpointerConfig {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

impl From<&AudioConfig> for EndpointerConfig {
    fn from(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            frame_duration_ms: config.frame_duration_ms,
            silence_timeout_ms: config.silence_timeout_ms,
            max_capture_ms: config.max_capture_ms,
        }
    }
}

/// Captures one utterance from a frame source
#[derive(Debug, Clone)]
pub struct Endpointer {
    config: EndpointerConfig,
}

impl Endpointer {
    pub fn new(config: EndpointerConfig) -> Self {
        Self { config }
    }

    /// Samples per frame
    pub fn frame_len(&self) -> usize {
        samples_for_ms(self.config.sample_rate, self.config.frame_duration_ms)
    }

    /// Consecutive silent frames that end capture
    pub fn silence_limit(&self) -> usize {
        let frame_ms = self.config.frame_duration_ms.max(1);
        ((self.config.silence_timeout_ms / frame_ms) as usize).max(1)
    }

    pub fn max_frames(&self) -> usize {
        let frame_ms = self.config.frame_duration_ms.max(1);
        ((self.config.max_capture_ms / frame_ms) as usize).max(self.silence_limit())
    }

    /// Read frames until the trailing silence limit or the capture cap
    pub fn run<S, C>(&self, source: &mut S, classifier: &mut C) -> Result<CapturedAudio>
    where
        S: AudioSource + ?Sized,
        C: SpeechClassifier + ?Sized,
    {
        let frame_len = self.frame_len();
        let silence_limit = self.silence_limit();
        let max_frames = self.max_frames();
        let sample_rate = source.sample_rate();

        let mut frame = vec![0i16; frame_len];
        let mut clip = CapturedAudio {
            samples: Vec::with_capacity(frame_len * silence_limit * 2),
            sample_rate,
            ..Default::default()
        };
        let mut silent_run = 0usize;

        loop {
            source.read_frame(&mut frame)?;
            let speech = classifier.is_speech(&frame, sample_rate)?;

            clip.samples.extend_from_slice(&frame);
            clip.frames += 1;

            if speech {
                clip.speech_frames += 1;
                silent_run = 0;
            } else {
                silent_run += 1;
            }

            if silent_run >= silence_limit {
                break;
            }

            if clip.frames >= max_frames {
                clip.truncated = true;
                tracing::warn!(
                    frames = clip.frames,
                    max_capture_ms = self.config.max_capture_ms,
                    "Capture reached maximum duration, truncating"
                );
                break;
            }
        }

        tracing::debug!(
            frames = clip.frames,
            speech_frames = clip.speech_frames,
            truncated = clip.truncated,
            "Utterance captured"
        );

        Ok(clip)
    }
}
