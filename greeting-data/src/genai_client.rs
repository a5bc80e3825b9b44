//! Generative service client.
//!
//! [`GenerativeService`] is the seam between the orchestrator and the remote
//! endpoints. [`GeminiClient`] implements it against the Gemini REST API:
//!
//!   POST {base}/models/{model}:generateContent     → text, image, speech
//!   POST {base}/models/{model}:predictLongRunning  → submit a video job
//!   GET  {base}/{operation}                        → video job status
//!   GET  {video uri}&key=...                       → rendered video bytes

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::error::GenAiError;
use crate::preferences::GreetingConfig;

/// Returned in place of an empty text completion.
pub const TEXT_FALLBACK: &str = "生成失败，请重试。";

pub const WIDE_ASPECT_RATIO: &str = "16:9";
const VIDEO_RESOLUTION: &str = "720p";

pub type ServiceFuture<T> = BoxFuture<'static, Result<T, GenAiError>>;

/// Opaque name of a running video render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoOperationHandle(pub String);

impl VideoOperationHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// One status report for a video render
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoJobStatus {
    pub done: bool,
    pub result_uri: Option<String>,
    /// Failure reported by the job itself
    pub error: Option<String>,
}

/// Remote generation endpoints used by the orchestrator
pub trait GenerativeService: Send + Sync {
    fn generate_text(&self, prompt: String) -> ServiceFuture<String>;

    /// Returns base64 encoded PNG bytes
    fn generate_image(&self, prompt: String, aspect_ratio: &'static str) -> ServiceFuture<String>;

    /// Returns base64 encoded 16-bit little-endian mono PCM
    fn generate_audio(&self, prompt: String, voice_name: &'static str) -> ServiceFuture<String>;

    /// `reference_image` is base64 encoded PNG
    fn submit_video_job(
        &self,
        prompt: String,
        reference_image: Option<String>,
    ) -> ServiceFuture<VideoOperationHandle>;

    fn poll_video_job(&self, handle: &VideoOperationHandle) -> ServiceFuture<VideoJobStatus>;

    fn download_video(&self, uri: String) -> ServiceFuture<Vec<u8>>;
}

#[derive(Debug, Clone)]
struct GeminiClientInner {
    base_url: String,
    client: reqwest::Client,
    headers: HeaderMap,
    api_key: Option<String>,
    text_model: String,
    image_model: String,
    tts_model: String,
    video_model: String,
}

/// Gemini REST client
#[derive(Debug)]
pub struct GeminiClient(Arc<RwLock<GeminiClientInner>>);

impl Clone for GeminiClient {
    fn clone(&self) -> Self {
        GeminiClient(Arc::clone(&self.0))
    }
}

impl GeminiClient {
    pub fn new(config: &GreetingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let inner = GeminiClientInner {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            headers: HeaderMap::new(),
            api_key: None,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            tts_model: config.tts_model.clone(),
            video_model: config.video_model.clone(),
        };

        let mut client = GeminiClient(Arc::new(RwLock::new(inner)));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            if client.set_key(key).is_err() {
                log::warn!("Configured API key is not a valid header value");
            }
        }
        client
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> Result<(), &'static str> {
        let header_name = HeaderName::from_str(key).map_err(|_| "Invalid header name")?;
        let header_value = HeaderValue::from_str(value).map_err(|_| "Invalid header value")?;
        self.write().headers.insert(header_name, header_value);
        Ok(())
    }

    pub fn set_key(&mut self, key: &str) -> Result<(), &'static str> {
        self.set_header("x-goog-api-key", key)?;
        self.write().api_key = Some(key.to_string());
        Ok(())
    }

    pub fn has_key(&self) -> bool {
        self.read().api_key.is_some()
    }

    /// Forget the key, e.g. after the service rejected it.
    pub fn clear_key(&self) {
        let mut inner = self.write();
        inner.headers.remove("x-goog-api-key");
        inner.api_key = None;
    }

    pub fn get_url(&self) -> String {
        self.read().base_url.clone()
    }

    fn snapshot(&self) -> GeminiClientInner {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, GeminiClientInner> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, GeminiClientInner> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl GeminiClientInner {
    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, GenAiError> {
        log::debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                GenAiError::Network(format!(
                    "Could not send request to {url}. Verify your connection and the server status: {e}"
                ))
            })?;
        read_json(url, response).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, GenAiError> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| GenAiError::Network(format!("Could not reach {url}: {e}")))?;
        read_json(url, response).await
    }

    async fn generate_content(&self, model: &str, body: Value) -> Result<Value, GenAiError> {
        let url = self.model_url(model, "generateContent");
        self.post_json(&url, &body).await
    }
}

async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, GenAiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(GenAiError::Api {
            status: status.as_u16(),
            message: api_error_message(&text),
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(200).collect();
        GenAiError::Parse(format!("{e}. Response from {url}: {preview}"))
    })
}

/// `error.message` from a Google API error body, or the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn candidate_parts(response: &Value) -> &[Value] {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text_from_response(response: &Value) -> String {
    let text: String = candidate_parts(response)
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    match text.trim() {
        "" => TEXT_FALLBACK.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn inline_data_from_response(response: &Value) -> Option<String> {
    candidate_parts(response)
        .iter()
        .find_map(|part| part["inlineData"]["data"].as_str())
        .map(str::to_string)
}

fn video_status_from_value(value: &Value) -> VideoJobStatus {
    let response = &value["response"];
    let result_uri = response["generateVideoResponse"]["generatedSamples"][0]["video"]["uri"]
        .as_str()
        .or_else(|| response["generatedVideos"][0]["video"]["uri"].as_str())
        .map(str::to_string);

    VideoJobStatus {
        done: value["done"].as_bool().unwrap_or(false),
        result_uri,
        error: value["error"]["message"].as_str().map(str::to_string),
    }
}

/// Append the credential as the `key` query parameter.
fn authenticated_download_url(uri: &str, api_key: Option<&str>) -> Result<url::Url, GenAiError> {
    let mut url = url::Url::parse(uri)
        .map_err(|e| GenAiError::Parse(format!("Invalid video uri {uri}: {e}")))?;
    if let Some(key) = api_key {
        url.query_pairs_mut().append_pair("key", key);
    }
    Ok(url)
}

impl GenerativeService for GeminiClient {
    fn generate_text(&self, prompt: String) -> ServiceFuture<String> {
        let inner = self.snapshot();
        Box::pin(async move {
            let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
            let response = inner.generate_content(&inner.text_model, body).await?;
            Ok(text_from_response(&response))
        })
    }

    fn generate_image(&self, prompt: String, aspect_ratio: &'static str) -> ServiceFuture<String> {
        let inner = self.snapshot();
        Box::pin(async move {
            let body = json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "responseModalities": ["IMAGE"],
                    "imageConfig": { "aspectRatio": aspect_ratio },
                },
            });
            let response = inner.generate_content(&inner.image_model, body).await?;
            inline_data_from_response(&response).ok_or(GenAiError::MissingPayload("image"))
        })
    }

    fn generate_audio(&self, prompt: String, voice_name: &'static str) -> ServiceFuture<String> {
        let inner = self.snapshot();
        Box::pin(async move {
            let body = json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice_name } },
                    },
                },
            });
            let response = inner.generate_content(&inner.tts_model, body).await?;
            inline_data_from_response(&response).ok_or(GenAiError::MissingPayload("audio"))
        })
    }

    fn submit_video_job(
        &self,
        prompt: String,
        reference_image: Option<String>,
    ) -> ServiceFuture<VideoOperationHandle> {
        let inner = self.snapshot();
        Box::pin(async move {
            let mut instance = json!({ "prompt": prompt });
            if let Some(image) = reference_image {
                instance["image"] = json!({ "bytesBase64Encoded": image, "mimeType": "image/png" });
            }
            let body = json!({
                "instances": [instance],
                "parameters": {
                    "aspectRatio": WIDE_ASPECT_RATIO,
                    "resolution": VIDEO_RESOLUTION,
                    "sampleCount": 1,
                },
            });

            let url = inner.model_url(&inner.video_model, "predictLongRunning");
            let response = inner.post_json(&url, &body).await?;
            let name = response["name"]
                .as_str()
                .ok_or(GenAiError::MissingPayload("video operation"))?;
            log::info!("Submitted video job {name}");
            Ok(VideoOperationHandle(name.to_string()))
        })
    }

    fn poll_video_job(&self, handle: &VideoOperationHandle) -> ServiceFuture<VideoJobStatus> {
        let inner = self.snapshot();
        let name = handle.name().trim_start_matches('/').to_string();
        Box::pin(async move {
            let url = format!("{}/{}", inner.base_url, name);
            let value = inner.get_json(&url).await?;
            Ok(video_status_from_value(&value))
        })
    }

    fn download_video(&self, uri: String) -> ServiceFuture<Vec<u8>> {
        let inner = self.snapshot();
        Box::pin(async move {
            let url = authenticated_download_url(&uri, inner.api_key.as_deref())?;
            let response = inner
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| GenAiError::Network(format!("Failed to fetch video from {uri}: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(GenAiError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&text),
                });
            }
            let bytes = response.bytes().await?;
            Ok(bytes.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = GreetingConfig {
            base_url: "http://localhost:8080/v1beta/".to_string(),
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let client = GeminiClient::new(&config);
        assert_eq!(client.get_url(), "http://localhost:8080/v1beta");

        let inner = client.snapshot();
        assert_eq!(inner.headers.get("x-goog-api-key").unwrap(), "secret");
        assert!(client.has_key());
        assert_eq!(
            inner.model_url("gemini-3-flash-preview", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_clear_key_shared_by_clones() {
        let config = GreetingConfig {
            api_key: Some("revoked".to_string()),
            ..Default::default()
        };
        let client = GeminiClient::new(&config);
        let mut other = client.clone();

        other.clear_key();
        assert!(!client.has_key());
        assert!(client.snapshot().headers.get("x-goog-api-key").is_none());

        other.set_key("fresh").unwrap();
        assert!(client.has_key());
        assert_eq!(client.snapshot().headers.get("x-goog-api-key").unwrap(), "fresh");
    }

    #[test]
    fn test_text_from_response() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "  新春快乐" }, { "text": "，万事如意 \n" }] } }]
        });
        assert_eq!(text_from_response(&response), "新春快乐，万事如意");
        assert_eq!(text_from_response(&json!({ "candidates": [] })), TEXT_FALLBACK);
    }

    #[test]
    fn test_inline_data_skips_text_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "here is your card" },
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } },
            ] } }]
        });
        assert_eq!(inline_data_from_response(&response).as_deref(), Some("iVBORw0KGgo="));
        assert_eq!(inline_data_from_response(&json!({})), None);
    }

    #[test]
    fn test_video_status_shapes() {
        let pending = video_status_from_value(&json!({ "name": "operations/abc" }));
        assert_eq!(pending, VideoJobStatus::default());

        let rest = video_status_from_value(&json!({
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://example.com/v.mp4?alt=media" } }
            ] } }
        }));
        assert!(rest.done);
        assert_eq!(rest.result_uri.as_deref(), Some("https://example.com/v.mp4?alt=media"));

        let sdk = video_status_from_value(&json!({
            "done": true,
            "response": { "generatedVideos": [{ "video": { "uri": "https://example.com/w.mp4" } }] }
        }));
        assert_eq!(sdk.result_uri.as_deref(), Some("https://example.com/w.mp4"));

        let failed = video_status_from_value(&json!({
            "done": true, "error": { "code": 3, "message": "prompt rejected" }
        }));
        assert_eq!(failed.error.as_deref(), Some("prompt rejected"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        assert_eq!(api_error_message(body), "Requested entity was not found.");
        assert_eq!(api_error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_download_url_carries_key() {
        let url = authenticated_download_url("https://example.com/v.mp4?alt=media", Some("k1")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/v.mp4?alt=media&key=k1");

        let url = authenticated_download_url("https://example.com/v.mp4", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/v.mp4");

        assert!(authenticated_download_url("not a uri", None).is_err());
    }
}
