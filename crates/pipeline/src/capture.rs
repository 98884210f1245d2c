//! Microphone capture via cpal

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use visit_agent_config::AudioConfig;
use visit_agent_core::{f32_to_i16, AudioSource, CapturedAudio, Result, UtteranceCapture};

use crate::endpointer::{Endpointer, EndpointerConfig};
use crate::vad::WebRtcClassifier;
use crate::PipelineError;

/// How long a read waits for the device before giving up
const DEVICE_STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Mono PCM16 frames from the default input device.
///
/// The cpal stream is not `Send`; open the source on the thread that reads it.
pub struct CpalSource {
    _stream: Stream,
    rx: Receiver<Vec<i16>>,
    pending: VecDeque<i16>,
    sample_rate: u32,
}

impl CpalSource {
    /// Open the default input device at `sample_rate`, mono
    pub fn open(sample_rate: u32) -> std::result::Result<Self, PipelineError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| PipelineError::Device("No input device available".to_string()))?;

        let sample_format = device.default_input_config()?.sample_format();
        let config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel::<Vec<i16>>();
        let on_error = |err: cpal::StreamError| {
            tracing::warn!(error = %err, "Input stream error");
        };

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(data.to_vec());
                },
                on_error,
                None,
            )?,
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(data.iter().map(|s| f32_to_i16(*s)).collect());
                },
                on_error,
                None,
            )?,
            other => {
                return Err(PipelineError::Device(format!(
                    "Unsupported input sample format: {:?}",
                    other
                )))
            },
        };

        stream.play()?;

        tracing::debug!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            ?sample_format,
            "Input stream started"
        );

        Ok(Self {
            _stream: stream,
            rx,
            pending: VecDeque::new(),
            sample_rate,
        })
    }
}

impl AudioSource for CpalSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, frame: &mut [i16]) -> Result<()> {
        while self.pending.len() < frame.len() {
            match self.rx.recv_timeout(DEVICE_STALL_TIMEOUT) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(PipelineError::Device(
                        "Input device stopped delivering audio".to_string(),
                    )
                    .into())
                },
                Err(RecvTimeoutError::Disconnected) => return Err(PipelineError::ChannelClosed.into()),
            }
        }

        let len = frame.len();
        for (dst, src) in frame.iter_mut().zip(self.pending.drain(..len)) {
            *dst = src;
        }
        Ok(())
    }
}

/// End-pointed capture from the default microphone.
///
/// Each call opens the device, records until trailing silence and closes it
/// again; the caller's thread is blocked for the whole utterance.
pub struct MicrophoneCapture {
    config: AudioConfig,
}

impl MicrophoneCapture {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

impl UtteranceCapture for MicrophoneCapture {
    fn capture(&mut self) -> Result<CapturedAudio> {
        let mut classifier =
            WebRtcClassifier::new(self.config.sample_rate, self.config.vad_aggressiveness)?;
        let mut source = CpalSource::open(self.config.sample_rate)?;
        let endpointer = Endpointer::new(EndpointerConfig::from(&self.config));

        tracing::info!(
            silence_timeout_ms = self.config.silence_timeout_ms,
            "Recording until silence"
        );
        let clip = endpointer.run(&mut source, &mut classifier)?;
        tracing::info!(
            duration_ms = clip.duration().as_millis() as u64,
            speech_frames = clip.speech_frames,
            "Recording finished"
        );

        Ok(clip)
    }
}
