pub mod audio_pipeline;
pub mod credentials;
pub mod error;
pub mod genai_client;
pub mod orchestrator;
pub mod pcm_decoder;
pub mod preferences;
pub mod prompts;
pub mod resources;
pub mod state;
pub mod types;
pub mod video_poll;
pub mod wav_encoder;

pub use audio_pipeline::produce_audio_resource;
pub use credentials::{ClientCredential, CredentialProvider, KeyPrompt};
pub use error::{DecodeError, EncodeError, GenAiError, PreconditionError, TaskError};
pub use genai_client::{
    GeminiClient, GenerativeService, ServiceFuture, VideoJobStatus, VideoOperationHandle,
};
pub use orchestrator::{GenerationEvent, GenerationOrchestrator};
pub use pcm_decoder::{decode_pcm16, PcmSampleBuffer, PCM_SAMPLE_RATE};
pub use preferences::GreetingConfig;
pub use prompts::{ToneProfile, VoiceProfile};
pub use resources::{ResourceHandle, ResourceStore};
pub use state::{GenerationState, StateAction};
pub use types::{FestivalType, GenerationTask, GreetingRequest, MediaKind, TargetAudience};
pub use video_poll::VideoPollLoop;
pub use wav_encoder::encode_wav;
