//! Fixed-interval polling of a remote video render.

use std::time::Duration;
use tokio::time::Instant;

use crate::error::GenAiError;
use crate::genai_client::{GenerativeService, VideoOperationHandle};
use crate::preferences::GreetingConfig;
use crate::resources::{ResourceHandle, ResourceStore};
use crate::types::MediaKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoPollLoop {
    pub interval: Duration,
    /// `None` waits as long as the job keeps running
    pub timeout: Option<Duration>,
}

impl VideoPollLoop {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn from_config(config: &GreetingConfig) -> Self {
        Self::new(config.video_poll_interval(), config.video_timeout())
    }

    /// Query status until the job reports done, sleeping `interval` between
    /// queries. Returns the result URI.
    pub async fn wait(
        &self,
        service: &dyn GenerativeService,
        handle: &VideoOperationHandle,
    ) -> Result<String, GenAiError> {
        let started = Instant::now();
        let mut queries = 0u32;

        loop {
            let status = service.poll_video_job(handle).await?;
            queries += 1;

            if status.done {
                log::info!("Video job {} finished after {} status queries", handle.name(), queries);
                if let Some(message) = status.error {
                    return Err(GenAiError::Job(message));
                }
                return status.result_uri.ok_or(GenAiError::MissingPayload("video"));
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    log::warn!("Video job {} still running after {:?}, giving up", handle.name(), timeout);
                    return Err(GenAiError::Timeout(timeout));
                }
            }

            log::debug!("Video job {} not done, waiting {:?}", handle.name(), self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Wait for the job, download the result and store it as a video resource.
    pub async fn resolve(
        &self,
        service: &dyn GenerativeService,
        handle: &VideoOperationHandle,
        store: &ResourceStore,
        file_name: String,
    ) -> Result<ResourceHandle, GenAiError> {
        let uri = self.wait(service, handle).await?;
        let bytes = service.download_video(uri).await?;
        Ok(store.create(MediaKind::Video, bytes, file_name))
    }
}
