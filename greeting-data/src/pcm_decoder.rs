//! Raw PCM payload decoding.
//!
//! The speech endpoint answers with base64 encoded signed 16-bit little-endian
//! samples. Rate and channel count are fixed by contract, never read from the
//! payload.

use base64::Engine as _;

use crate::error::DecodeError;

/// Sample rate of the speech endpoint's PCM payloads.
pub const PCM_SAMPLE_RATE: u32 = 24_000;

/// Normalized samples, one buffer per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct PcmSampleBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl PcmSampleBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data.trim())?)
}

/// Decode a base64 PCM payload into per-channel samples.
pub fn decode_pcm16(
    base64_pcm: &str,
    sample_rate: u32,
    channel_count: usize,
) -> Result<PcmSampleBuffer, DecodeError> {
    let bytes = decode_base64(base64_pcm)?;
    Ok(pcm16_to_buffer(&bytes, sample_rate, channel_count))
}

/// Deinterleave little-endian i16 samples, scaling each by 1/32768.
///
/// A trailing odd byte is dropped, as is a trailing partial frame.
pub fn pcm16_to_buffer(bytes: &[u8], sample_rate: u32, channel_count: usize) -> PcmSampleBuffer {
    let channel_count = channel_count.max(1);
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let frame_count = samples.len() / channel_count;

    let channels = (0..channel_count)
        .map(|channel| {
            (0..frame_count)
                .map(|frame| samples[frame * channel_count + channel] as f32 / 32768.0)
                .collect()
        })
        .collect();

    PcmSampleBuffer {
        sample_rate,
        channels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_normalization_is_asymmetric() {
        let buffer = decode_pcm16(&encode(&[i16::MIN, 0, i16::MAX]), PCM_SAMPLE_RATE, 1).unwrap();
        let samples = &buffer.channels[0];
        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], 0.0);
        assert!(samples[2] < 1.0);
        assert!((samples[2] - 0.999_969_5).abs() < 1e-6);
    }

    #[test]
    fn test_odd_byte_is_truncated() {
        let b64 = base64::engine::general_purpose::STANDARD.encode([0x00, 0x40, 0x7f]);
        let buffer = decode_pcm16(&b64, PCM_SAMPLE_RATE, 1).unwrap();
        assert_eq!(buffer.frame_count(), 1);
        assert_eq!(buffer.channels[0][0], 0.5);
    }

    #[test]
    fn test_deinterleave_stereo() {
        let buffer = decode_pcm16(&encode(&[16384, -16384, 8192, -8192, 1]), 48_000, 2).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.channels[0], vec![0.5, 0.25]);
        assert_eq!(buffer.channels[1], vec![-0.5, -0.25]);
        assert_eq!(buffer.sample_rate, 48_000);
    }

    #[test]
    fn test_malformed_base64() {
        assert!(matches!(
            decode_pcm16("not base64!!", PCM_SAMPLE_RATE, 1),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_empty_payload() {
        let buffer = decode_pcm16("", PCM_SAMPLE_RATE, 1).unwrap();
        assert_eq!(buffer.frame_count(), 0);
    }
}
