//! Generation orchestrator.
//!
//! Owns the session [`GenerationState`] and runs the four generation tasks
//! (text, image, audio, video). Every task follows the same lifecycle:
//!
//! ```text
//! IDLE --trigger, precondition met-----> BUSY --success--> IDLE (result stored)
//!                                        BUSY --failure--> IDLE (alert, state unchanged)
//! IDLE --trigger, precondition unmet---> IDLE (alert, no remote call)
//! ```
//!
//! Tasks take `&self` and may run concurrently with each other. A second
//! trigger of a task that is already running is rejected with
//! [`TaskError::Busy`]. The state lock is never held across an `.await`.

use base64::Engine as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;

use crate::audio_pipeline::produce_audio_resource;
use crate::credentials::CredentialProvider;
use crate::error::{GenAiError, PreconditionError, TaskError};
use crate::genai_client::{GenerativeService, WIDE_ASPECT_RATIO};
use crate::pcm_decoder::decode_base64;
use crate::preferences::GreetingConfig;
use crate::prompts::{self, VoiceProfile};
use crate::resources::{ResourceHandle, ResourceStore};
use crate::state::{GenerationState, StateAction};
use crate::types::{GenerationTask, MediaKind};
use crate::video_poll::VideoPollLoop;

/// Progress notifications for the host UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationEvent {
    Started(GenerationTask),
    Finished(GenerationTask),
    /// Blocking message for the user
    Alert {
        task: GenerationTask,
        message: String,
    },
    CredentialSelectionRequested,
}

pub struct GenerationOrchestrator {
    config: GreetingConfig,
    service: Arc<dyn GenerativeService>,
    credentials: Arc<dyn CredentialProvider>,
    resources: ResourceStore,
    state: Mutex<GenerationState>,
    /// Cached answer of the credential provider
    credential_valid: AtomicBool,
    events: Option<UnboundedSender<GenerationEvent>>,
}

/// Clears a task's busy flag however the task exits.
struct BusyGuard<'a> {
    orchestrator: &'a GenerationOrchestrator,
    task: GenerationTask,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.lock_state().set_busy(self.task, false);
        self.orchestrator.emit(GenerationEvent::Finished(self.task));
    }
}

impl GenerationOrchestrator {
    pub fn new(
        config: GreetingConfig,
        service: Arc<dyn GenerativeService>,
        credentials: Arc<dyn CredentialProvider>,
        resources: ResourceStore,
    ) -> Self {
        Self {
            config,
            service,
            credentials,
            resources,
            state: Mutex::new(GenerationState::default()),
            credential_valid: AtomicBool::new(true),
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<GenerationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &GreetingConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn snapshot(&self) -> GenerationState {
        self.lock_state().clone()
    }

    pub fn handle_action(&self, action: StateAction) {
        self.lock_state().handle_action(&action);
    }

    pub fn has_valid_credential(&self) -> bool {
        self.credential_valid.load(Ordering::SeqCst)
    }

    /// Ask the credential provider again and cache the answer.
    pub async fn refresh_credential_status(&self) -> bool {
        let valid = self.credentials.has_valid_credential().await;
        self.credential_valid.store(valid, Ordering::SeqCst);
        valid
    }

    /// Open the host's credential selector and re-check once it closes.
    pub async fn select_credential(&self) -> bool {
        self.emit(GenerationEvent::CredentialSelectionRequested);
        self.credentials.open_selector().await;
        self.refresh_credential_status().await
    }

    pub async fn generate_text(&self) -> Result<(), TaskError> {
        let result = self.run_text().await;
        self.report(GenerationTask::Text, result)
    }

    pub async fn generate_image(&self) -> Result<(), TaskError> {
        let result = self.run_image().await;
        self.report(GenerationTask::Image, result)
    }

    pub async fn generate_audio(&self) -> Result<(), TaskError> {
        let result = self.run_audio().await;
        self.report(GenerationTask::Audio, result)
    }

    pub async fn generate_video(&self) -> Result<(), TaskError> {
        let result = self.run_video().await;
        self.report(GenerationTask::Video, result)
    }

    /// Release every resource this session owns.
    pub fn teardown(&self) {
        let handles = self.lock_state().take_resources();
        for handle in handles {
            self.resources.release(&handle);
        }
    }

    async fn run_text(&self) -> Result<(), TaskError> {
        let task = GenerationTask::Text;
        let (_busy, snapshot) = self.begin(task, false)?;

        let prompt = prompts::greeting_prompt(&snapshot.request());
        let text = self
            .service
            .generate_text(prompt)
            .await
            .map_err(|source| TaskError::Remote { task, source })?;

        self.lock_state().generated_text = text;
        Ok(())
    }

    async fn run_image(&self) -> Result<(), TaskError> {
        let task = GenerationTask::Image;
        let (_busy, snapshot) = self.begin(task, true)?;

        let prompt = prompts::image_prompt(&snapshot.generated_text, snapshot.festival);
        let result: Result<ResourceHandle, GenAiError> = async {
            let png = self.service.generate_image(prompt, WIDE_ASPECT_RATIO).await?;
            let bytes = decode_base64(&png)?;
            let name = MediaKind::Image.download_name(snapshot.festival);
            Ok(self.resources.create(MediaKind::Image, bytes, name))
        }
        .await;

        let handle = result.map_err(|source| TaskError::Remote { task, source })?;
        self.store_resource(handle);
        Ok(())
    }

    async fn run_audio(&self) -> Result<(), TaskError> {
        let task = GenerationTask::Audio;
        let (_busy, snapshot) = self.begin(task, true)?;

        let voice = VoiceProfile::for_audience(snapshot.audience);
        log::debug!("Narrating with voice {} ({:?})", voice.voice_name, voice.tone);
        let prompt = prompts::speech_prompt(&snapshot.generated_text, snapshot.festival, &voice);

        let result: Result<ResourceHandle, GenAiError> = async {
            let pcm = self.service.generate_audio(prompt, voice.voice_name).await?;
            produce_audio_resource(
                &self.resources,
                &pcm,
                self.config.sample_rate,
                MediaKind::Audio.download_name(snapshot.festival),
            )
        }
        .await;

        let handle = result.map_err(|source| TaskError::Remote { task, source })?;
        self.store_resource(handle);
        Ok(())
    }

    async fn run_video(&self) -> Result<(), TaskError> {
        let task = GenerationTask::Video;
        if self.lock_state().is_busy(task) {
            return Err(TaskError::Busy(task));
        }
        if !self.has_valid_credential() {
            log::info!("Video requested without a billing-enabled credential");
            self.select_credential().await;
            return Err(TaskError::CredentialRequired { invalidated: false });
        }

        let (busy, snapshot) = self.begin(task, true)?;

        let prompt = prompts::video_prompt(&snapshot.generated_text, snapshot.festival);
        let reference = snapshot
            .image
            .as_ref()
            .and_then(|image| self.resources.bytes(image))
            .map(|png| base64::engine::general_purpose::STANDARD.encode(png.as_slice()));

        let result: Result<ResourceHandle, GenAiError> = async {
            let job = self.service.submit_video_job(prompt, reference).await?;
            VideoPollLoop::from_config(&self.config)
                .resolve(
                    self.service.as_ref(),
                    &job,
                    &self.resources,
                    MediaKind::Video.download_name(snapshot.festival),
                )
                .await
        }
        .await;

        match result {
            Ok(handle) => {
                self.store_resource(handle);
                Ok(())
            }
            Err(source) if source.is_entity_not_found() => {
                drop(busy);
                log::warn!("Credential rejected by the video endpoint: {source}");
                self.credential_valid.store(false, Ordering::SeqCst);
                self.credentials.invalidate();
                self.select_credential().await;
                Err(TaskError::CredentialRequired { invalidated: true })
            }
            Err(source) => Err(TaskError::Remote { task, source }),
        }
    }

    /// Check guards and mark `task` busy, all under one lock.
    fn begin(
        &self,
        task: GenerationTask,
        needs_text: bool,
    ) -> Result<(BusyGuard<'_>, GenerationState), TaskError> {
        let snapshot = {
            let mut state = self.lock_state();
            if state.is_busy(task) {
                return Err(TaskError::Busy(task));
            }
            if needs_text && !state.has_text() {
                return Err(TaskError::Precondition {
                    task,
                    reason: PreconditionError::MissingText,
                });
            }
            state.set_busy(task, true);
            state.clone()
        };

        log::info!("Starting {task} generation");
        self.emit(GenerationEvent::Started(task));
        Ok((
            BusyGuard {
                orchestrator: self,
                task,
            },
            snapshot,
        ))
    }

    /// Keep `handle` as the current resource of its kind, releasing the old one.
    fn store_resource(&self, handle: ResourceHandle) {
        let previous = self.lock_state().replace_resource(handle);
        if let Some(previous) = previous {
            self.resources.release(&previous);
        }
    }

    fn report(&self, task: GenerationTask, result: Result<(), TaskError>) -> Result<(), TaskError> {
        match &result {
            Ok(()) => log::info!("Finished {task} generation"),
            Err(err) => {
                log::warn!("{err}");
                if let Some(message) = err.alert_message() {
                    self.emit(GenerationEvent::Alert { task, message });
                }
            }
        }
        result
    }

    fn emit(&self, event: GenerationEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for GenerationOrchestrator {
    fn drop(&mut self) {
        self.teardown();
    }
}
