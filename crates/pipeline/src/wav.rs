//! WAV container encoding for captured utterances

use std::io::Cursor;

use visit_agent_core::CapturedAudio;

use crate::PipelineError;

/// Encode a clip as mono 16-bit linear PCM WAV at its own sample rate
pub fn encode_wav(clip: &CapturedAudio) -> Result<Vec<u8>, PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + clip.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in &clip.samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_header_and_samples() {
        let clip = CapturedAudio {
            samples: vec![0, 100, -100, i16::MAX],
            sample_rate: 16_000,
            frames: 1,
            speech_frames: 1,
            truncated: false,
        };

        let bytes = encode_wav(&clip).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + 8);

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, clip.samples);
    }

    #[test]
    fn test_encode_empty_clip() {
        let clip = CapturedAudio {
            sample_rate: 16_000,
            ..Default::default()
        };
        let bytes = encode_wav(&clip).unwrap();
        assert_eq!(bytes.len(), 44);
    }
}
