//! Decoded audio sample buffers
//!
//! All playback in the engine goes through [`SampleData`]: interleaved f32
//! samples plus channel/rate metadata. Assets are decoded once at preload
//! time and shared between pool handles; synthesized sounds are rendered
//! straight into the same representation.

use std::io::Cursor;

use rodio::{Decoder, Source};

use crate::error::AudioError;

/// Interleaved PCM samples with format metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    /// Number of interleaved channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved sample frames, each in [-1, 1]
    pub samples: Vec<f32>,
}

impl SampleData {
    /// Create a buffer from raw parts.
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Playback duration in seconds at normal speed.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Decode an encoded audio file (WAV, OGG, MP3, FLAC) into a sample buffer.
///
/// Codec selection and decoding are delegated entirely to the platform media
/// stack; this function only collects the result.
///
/// # Errors
/// `DecodeFailed` if the bytes are not a recognized audio format.
pub fn decode_bytes(bytes: &[u8]) -> Result<SampleData, AudioError> {
    let decoder = Decoder::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;

    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples().collect();

    if samples.is_empty() {
        return Err(AudioError::DecodeFailed("decoded stream is empty".into()));
    }

    Ok(SampleData::new(channels, sample_rate, samples))
}

#[cfg(test)]
pub(crate) mod test_util {
    /// Build a minimal mono 16-bit PCM WAV file around `samples`.
    ///
    /// Enough for the platform decoder in tests; not a general WAV writer.
    pub fn make_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + samples.len() * 2);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_and_duration() {
        let data = SampleData::new(2, 100, vec![0.0; 400]);
        assert_eq!(data.frames(), 200);
        assert!((data.duration_secs() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_wav_roundtrip() {
        let wav = test_util::make_wav(22_050, &[0, 16_384, -16_384, 0]);
        let data = decode_bytes(&wav).expect("wav should decode");
        assert_eq!(data.channels, 1);
        assert_eq!(data.sample_rate, 22_050);
        assert_eq!(data.frames(), 4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_bytes(b"definitely not audio");
        assert!(matches!(result, Err(AudioError::DecodeFailed(_))));
    }
}
