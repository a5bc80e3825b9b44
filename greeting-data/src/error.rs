//! Error types for the generation pipeline.

use std::time::Duration;
use thiserror::Error;

use crate::types::GenerationTask;

/// Error message the remote service uses when the selected key or project is gone.
pub const ENTITY_NOT_FOUND_SIGNATURE: &str = "Requested entity was not found";

/// Audio payload could not be turned into samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Samples could not be written as a WAV file.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Rate is zero or its byte rate does not fit the 32-bit header field.
    #[error("Unsupported sample rate: {0} Hz")]
    SampleRate(u32),

    #[error("{0} samples do not fit in a WAV data chunk")]
    TooLong(usize),

    #[error("WAV writer failed: {0}")]
    Wav(#[from] hound::Error),
}

/// Errors raised while talking to the generative service.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// Request could not be sent or the body could not be read.
    #[error("Network error: {0}")]
    Network(String),

    /// Service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Response was well-formed but carried no payload of the requested kind.
    #[error("Response contained no {0} data")]
    MissingPayload(&'static str),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Video job finished but reported its own failure.
    #[error("Video job failed: {0}")]
    Job(String),

    /// Video job was still running when the poll deadline passed.
    #[error("Video job did not finish within {0:?}")]
    Timeout(Duration),
}

impl GenAiError {
    /// Whether this failure means the credential or its project no longer exists.
    pub fn is_entity_not_found(&self) -> bool {
        match self {
            GenAiError::Api { message, .. } => message.contains(ENTITY_NOT_FOUND_SIGNATURE),
            GenAiError::Network(message) | GenAiError::Parse(message) | GenAiError::Job(message) => {
                message.contains(ENTITY_NOT_FOUND_SIGNATURE)
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GenAiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GenAiError::Parse(err.to_string())
        } else {
            GenAiError::Network(err.to_string())
        }
    }
}

/// A task refused to start because local state is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("greeting text is empty")]
    MissingText,
}

/// Outcome of a generation task that did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{task} generation not started: {reason}")]
    Precondition {
        task: GenerationTask,
        reason: PreconditionError,
    },

    /// The same task is already in flight.
    #[error("{0} generation is already running")]
    Busy(GenerationTask),

    #[error("{task} generation failed: {source}")]
    Remote {
        task: GenerationTask,
        #[source]
        source: GenAiError,
    },

    /// Video needs a billing-enabled credential; the selection flow was opened.
    #[error("a billing-enabled credential is required (invalidated: {invalidated})")]
    CredentialRequired { invalidated: bool },
}

impl TaskError {
    /// Text shown to the user, if this outcome warrants a blocking alert.
    pub fn alert_message(&self) -> Option<String> {
        match self {
            TaskError::Precondition { task, .. } => Some(
                match task {
                    GenerationTask::Audio => "请先生成祝福语",
                    _ => "请先生成或输入祝福语",
                }
                .to_string(),
            ),
            TaskError::Remote { task, source } => Some(match task {
                GenerationTask::Text => format!("文案生成失败: {source}"),
                GenerationTask::Image => "图片生成失败".to_string(),
                GenerationTask::Audio => "音频生成失败".to_string(),
                GenerationTask::Video => {
                    "视频生成失败。由于视频生成较为复杂，请确保网络通畅且 API Key 余额充足。".to_string()
                }
            }),
            TaskError::Busy(_) | TaskError::CredentialRequired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_not_found_signature() {
        let err = GenAiError::Api {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        };
        assert!(err.is_entity_not_found());

        let err = GenAiError::Api {
            status: 500,
            message: "Internal error".to_string(),
        };
        assert!(!err.is_entity_not_found());
        assert!(!GenAiError::MissingPayload("video").is_entity_not_found());
        assert!(GenAiError::Job("Requested entity was not found.".to_string()).is_entity_not_found());
        assert!(!GenAiError::Job("prompt rejected".to_string()).is_entity_not_found());
    }

    #[test]
    fn test_alert_messages() {
        let missing_text = TaskError::Precondition {
            task: GenerationTask::Audio,
            reason: PreconditionError::MissingText,
        };
        assert_eq!(missing_text.alert_message().as_deref(), Some("请先生成祝福语"));

        let remote = TaskError::Remote {
            task: GenerationTask::Text,
            source: GenAiError::Network("offline".to_string()),
        };
        assert_eq!(
            remote.alert_message().as_deref(),
            Some("文案生成失败: Network error: offline")
        );

        assert!(TaskError::Busy(GenerationTask::Image).alert_message().is_none());
        assert!(TaskError::CredentialRequired { invalidated: true }
            .alert_message()
            .is_none());
    }
}
