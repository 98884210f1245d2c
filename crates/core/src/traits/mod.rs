//! Collaborator traits
//!
//! ```text
//! Model:
//!   - ModelConnection: configure, append input, trigger generation, event feed
//!
//! Audio:
//!   - AudioSource: fixed-size PCM16 frames from a device
//!   - SpeechClassifier: speech / silence per frame
//!   - UtteranceCapture: one end-pointed utterance
//!   - AudioSink: blocking playback of response audio
//! ```

mod llm;
mod speech;

pub use llm::{EventStream, ModelConnection};
pub use speech::{AudioSink, AudioSource, SpeechClassifier, UtteranceCapture};
