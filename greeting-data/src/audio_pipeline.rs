//! Speech payload -> playable WAV resource.

use crate::error::GenAiError;
use crate::pcm_decoder::decode_pcm16;
use crate::resources::{ResourceHandle, ResourceStore};
use crate::types::MediaKind;
use crate::wav_encoder::encode_wav;

/// Decode a base64 mono PCM payload, wrap it in a WAV container and store it.
pub fn produce_audio_resource(
    store: &ResourceStore,
    base64_pcm: &str,
    sample_rate: u32,
    file_name: impl Into<String>,
) -> Result<ResourceHandle, GenAiError> {
    let buffer = decode_pcm16(base64_pcm, sample_rate, 1)?;
    log::debug!(
        "Decoded {} PCM frames at {} Hz ({:.2}s)",
        buffer.frame_count(),
        buffer.sample_rate,
        buffer.frame_count() as f32 / buffer.sample_rate.max(1) as f32
    );
    let wav = encode_wav(&buffer)?;
    Ok(store.create(MediaKind::Audio, wav, file_name))
}
