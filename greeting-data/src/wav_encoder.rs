//! RIFF/WAV serialization for 16-bit mono PCM.

use std::io::Cursor;

use crate::error::EncodeError;
use crate::pcm_decoder::PcmSampleBuffer;

pub const WAV_HEADER_LEN: usize = 44;

const BYTES_PER_SAMPLE: usize = 2;

const WAV_SPEC_CHANNELS: u16 = 1;
const WAV_SPEC_BITS: u16 = 16;

/// Encode the first channel of `buffer` as a mono 16-bit WAV file.
pub fn encode_wav(buffer: &PcmSampleBuffer) -> Result<Vec<u8>, EncodeError> {
    let samples = buffer.channels.first().map_or(&[][..], Vec::as_slice);
    encode_mono(samples, buffer.sample_rate)
}

pub fn encode_mono(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, EncodeError> {
    if sample_rate == 0 || sample_rate.checked_mul(BYTES_PER_SAMPLE as u32).is_none() {
        return Err(EncodeError::SampleRate(sample_rate));
    }
    let data_len = data_chunk_len(samples.len())?;

    let spec = hound::WavSpec {
        channels: WAV_SPEC_CHANNELS,
        sample_rate,
        bits_per_sample: WAV_SPEC_BITS,
        sample_format: hound::SampleFormat::Int,
    };

    let mut out = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + data_len as usize));
    let mut writer = hound::WavWriter::new(&mut out, spec)?;
    for &sample in samples {
        writer.write_sample(sample_to_i16(sample))?;
    }
    writer.finalize()?;
    Ok(out.into_inner())
}

/// Size of the data chunk, checked against the 32-bit RIFF size fields.
fn data_chunk_len(sample_count: usize) -> Result<u32, EncodeError> {
    sample_count
        .checked_mul(BYTES_PER_SAMPLE)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add((WAV_HEADER_LEN - 8) as u32).is_some())
        .ok_or(EncodeError::TooLong(sample_count))
}

/// Clamp to [-1, 1], then scale negatives by 32768 and the rest by 32767.
///
/// NaN encodes as silence.
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm_decoder::{pcm16_to_buffer, PCM_SAMPLE_RATE};

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn read_samples(wav: Vec<u8>) -> (hound::WavSpec, Vec<i16>) {
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        let samples = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        (spec, samples)
    }

    #[test]
    fn test_header_bytes() {
        let wav = encode_mono(&[0.0; 3], PCM_SAMPLE_RATE).unwrap();
        let expected_header: [u8; 44] = [
            b'R', b'I', b'F', b'F', 42, 0, 0, 0, b'W', b'A', b'V', b'E', //
            b'f', b'm', b't', b' ', 16, 0, 0, 0, 1, 0, 1, 0, //
            0xc0, 0x5d, 0, 0, // 24000
            0x80, 0xbb, 0, 0, // 48000
            2, 0, 16, 0, //
            b'd', b'a', b't', b'a', 6, 0, 0, 0,
        ];
        assert_eq!(&wav[..44], &expected_header[..]);
        assert_eq!(wav.len(), 50);
    }

    #[test]
    fn test_header_sizes_track_sample_count() {
        for n in [0usize, 1, 7, 24_000] {
            let wav = encode_mono(&vec![0.1; n], PCM_SAMPLE_RATE).unwrap();
            assert_eq!(u32_at(&wav, 4) as usize, 36 + 2 * n);
            assert_eq!(u32_at(&wav, 40) as usize, 2 * n);
            assert_eq!(wav.len(), 44 + 2 * n);
        }
    }

    #[test]
    fn test_sample_scaling() {
        assert_eq!(sample_to_i16(-1.0), i16::MIN);
        assert_eq!(sample_to_i16(1.0), i16::MAX);
        assert_eq!(sample_to_i16(2.5), i16::MAX);
        assert_eq!(sample_to_i16(-7.0), i16::MIN);
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(-0.5), -16384);
        // 0.5 * 32767 = 16383.5, truncated
        assert_eq!(sample_to_i16(0.5), 16383);
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_pcm_round_trip() {
        let codes: Vec<i16> = vec![i16::MIN, -12345, -1, 0, 1, 12345, i16::MAX];
        let bytes: Vec<u8> = codes.iter().flat_map(|c| c.to_le_bytes()).collect();
        let wav = encode_wav(&pcm16_to_buffer(&bytes, PCM_SAMPLE_RATE, 1)).unwrap();

        let (_, decoded) = read_samples(wav);
        assert_eq!(decoded.len(), codes.len());
        for (original, decoded) in codes.iter().zip(&decoded) {
            if *original <= 0 {
                assert_eq!(original, decoded);
            } else {
                // Positive codes are scaled by 32767/32768 on the way back.
                assert!(original - decoded <= 1, "{original} -> {decoded}");
            }
        }
    }

    #[test]
    fn test_readable_by_hound() {
        let samples = [0.0f32, 0.25, -0.25, 0.75, -1.0];
        let (spec, read) = read_samples(encode_mono(&samples, PCM_SAMPLE_RATE).unwrap());
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, PCM_SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(read, vec![0, 8191, -8192, 24575, i16::MIN]);
    }

    #[test]
    fn test_duration() {
        let wav = encode_mono(&vec![0.0; 48_000], PCM_SAMPLE_RATE).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.duration() / reader.spec().sample_rate, 2);
    }

    #[test]
    fn test_rejects_unrepresentable_sizes() {
        assert!(matches!(
            encode_mono(&[0.0], u32::MAX),
            Err(EncodeError::SampleRate(u32::MAX))
        ));
        assert!(matches!(encode_mono(&[0.0], 0), Err(EncodeError::SampleRate(0))));

        assert_eq!(data_chunk_len(3).unwrap(), 6);
        assert!(matches!(
            data_chunk_len(usize::MAX),
            Err(EncodeError::TooLong(usize::MAX))
        ));
        let too_many = (u32::MAX / 2) as usize;
        assert!(data_chunk_len(too_many).is_err());
    }
}
