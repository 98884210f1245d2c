//! Audio device and classification traits
//!
//! Capture and playback block the calling thread for their whole duration,
//! so these traits are synchronous.

use crate::{CapturedAudio, Result};

/// Continuous source of fixed-size mono PCM16 frames
pub trait AudioSource {
    /// Sample rate of the frames produced
    fn sample_rate(&self) -> u32;

    /// Fill `frame` completely, blocking until enough samples are available
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<()>;
}

/// Binary speech / silence classifier for a single frame
///
/// Implementations:
/// - `WebRtcClassifier` - WebRTC VAD with aggressiveness 0..=3
pub trait SpeechClassifier {
    fn is_speech(&mut self, frame: &[i16], sample_rate: u32) -> Result<bool>;
}

/// Records one end-pointed utterance
///
/// # Example
///
/// ```ignore
/// let mut mic = MicrophoneCapture::new(settings.audio.clone());
/// let clip = mic.capture()?;
/// println!("captured {} frames", clip.frames);
/// ```
pub trait UtteranceCapture: Send {
    fn capture(&mut self) -> Result<CapturedAudio>;
}

/// Plays PCM16 response audio
pub trait AudioSink: Send {
    /// Play concatenated response fragments, returning once the device is done
    fn play(&mut self, fragments: &[Vec<u8>]) -> Result<()>;
}
