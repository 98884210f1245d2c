//! Padded playback of streamed response audio

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use visit_agent_config::PlaybackConfig;
use visit_agent_core::{pcm16_from_le_bytes, samples_for_ms, AudioSink, Result};

use crate::PipelineError;

/// Joins response fragments into one clip with silence pads on both ends
#[derive(Debug, Clone)]
pub struct PlaybackBuffer {
    sample_rate: u32,
    lead_padding_ms: u32,
    trail_padding_ms: u32,
}

impl PlaybackBuffer {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            lead_padding_ms: config.lead_padding_ms,
            trail_padding_ms: config.trail_padding_ms,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Padded PCM16 samples, or `None` when there is nothing to play.
    ///
    /// Fragments are joined as bytes before decoding, so a sample split
    /// across two fragments survives.
    pub fn render(&self, fragments: &[Vec<u8>]) -> Option<Vec<i16>> {
        let total: usize = fragments.iter().map(Vec::len).sum();
        if total < 2 {
            return None;
        }

        let bytes = fragments.concat();
        let audio = pcm16_from_le_bytes(&bytes);

        let lead = samples_for_ms(self.sample_rate, self.lead_padding_ms);
        let trail = samples_for_ms(self.sample_rate, self.trail_padding_ms);

        let mut samples = Vec::with_capacity(lead + audio.len() + trail);
        samples.resize(lead, 0);
        samples.extend_from_slice(&audio);
        samples.resize(lead + audio.len() + trail, 0);
        Some(samples)
    }
}

/// Blocking playback on the default output device
pub struct RodioSink {
    buffer: PlaybackBuffer,
}

impl RodioSink {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            buffer: PlaybackBuffer::new(config),
        }
    }
}

impl AudioSink for RodioSink {
    fn play(&mut self, fragments: &[Vec<u8>]) -> Result<()> {
        let Some(samples) = self.buffer.render(fragments) else {
            return Ok(());
        };

        let (_stream, handle) = OutputStream::try_default()
            .map_err(|e| PipelineError::Device(format!("Failed to open output stream: {}", e)))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| PipelineError::Device(format!("Failed to create sink: {}", e)))?;

        tracing::debug!(
            samples = samples.len(),
            sample_rate = self.buffer.sample_rate(),
            "Playing response audio"
        );

        sink.append(SamplesBuffer::new(1, self.buffer.sample_rate(), samples));
        sink.sleep_until_end();
        Ok(())
    }
}
