//! Application configuration, persisted as JSON in the user config dir.
//!
//! The library never reads credentials from the environment on its own; the
//! host calls [`GreetingConfig::with_env_overrides`] and hands the finished
//! object to the orchestrator.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pcm_decoder::PCM_SAMPLE_RATE;

const APP_DIR: &str = "greeting-studio";
const CONFIG_FILENAME: &str = "config.json";

/// Accepted range for `sample_rate`
const SAMPLE_RATES: std::ops::RangeInclusive<u32> = 8_000..=192_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreetingConfig {
    /// Key for the generative service; video needs a billing-enabled one
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub tts_model: String,
    pub video_model: String,
    /// Rate of the PCM returned by the speech model
    pub sample_rate: u32,
    pub video_poll_interval_secs: u64,
    /// Give up on a video job after this long; `None` waits forever
    pub video_timeout_secs: Option<u64>,
    pub request_timeout_secs: u64,
    /// Where the shell writes downloaded artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            video_model: "veo-3.1-fast-generate-preview".to_string(),
            sample_rate: PCM_SAMPLE_RATE,
            video_poll_interval_secs: 10,
            video_timeout_secs: Some(15 * 60),
            request_timeout_secs: 600,
            output_dir: None,
        }
    }
}

impl GreetingConfig {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                Self::sanitized(config)
            }
            Err(e) => {
                log::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if !SAMPLE_RATES.contains(&self.sample_rate) {
            log::warn!(
                "Ignoring sample_rate {} outside {:?}, using {}",
                self.sample_rate,
                SAMPLE_RATES,
                PCM_SAMPLE_RATE
            );
            self.sample_rate = PCM_SAMPLE_RATE;
        }
        self
    }

    /// Overlay `GEMINI_API_KEY` (or `API_KEY`) and `GREETING_BASE_URL`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = key {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup("GREETING_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().trim_end_matches('/').to_string();
        }
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().map_or(false, |k| !k.is_empty())
    }

    pub fn video_poll_interval(&self) -> Duration {
        Duration::from_secs(self.video_poll_interval_secs)
    }

    pub fn video_timeout(&self) -> Option<Duration> {
        self.video_timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
