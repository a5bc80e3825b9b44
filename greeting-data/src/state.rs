use crate::resources::ResourceHandle;
use crate::types::{FestivalType, GenerationTask, GreetingRequest, MediaKind, TargetAudience};

/// Edits the user can make to the session between generations
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StateAction {
    SetFestival(FestivalType),
    SetAudience(TargetAudience),
    SetKeywords(String),
    /// Replace the generated greeting with user-edited text
    EditText(String),
    #[default]
    None,
}

/// Session record shared by the four generation tasks
///
/// Each task only writes its own busy flag and its own result field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub festival: FestivalType,
    pub audience: TargetAudience,
    pub keywords: String,
    pub generated_text: String,

    pub image: Option<ResourceHandle>,
    pub audio: Option<ResourceHandle>,
    pub video: Option<ResourceHandle>,

    pub is_generating_text: bool,
    pub is_generating_image: bool,
    pub is_generating_audio: bool,
    pub is_generating_video: bool,
}

impl GenerationState {
    pub fn request(&self) -> GreetingRequest {
        GreetingRequest {
            festival: self.festival,
            audience: self.audience,
            keywords: self.keywords.clone(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.generated_text.trim().is_empty()
    }

    pub fn is_busy(&self, task: GenerationTask) -> bool {
        match task {
            GenerationTask::Text => self.is_generating_text,
            GenerationTask::Image => self.is_generating_image,
            GenerationTask::Audio => self.is_generating_audio,
            GenerationTask::Video => self.is_generating_video,
        }
    }

    pub fn set_busy(&mut self, task: GenerationTask, busy: bool) {
        let flag = match task {
            GenerationTask::Text => &mut self.is_generating_text,
            GenerationTask::Image => &mut self.is_generating_image,
            GenerationTask::Audio => &mut self.is_generating_audio,
            GenerationTask::Video => &mut self.is_generating_video,
        };
        *flag = busy;
    }

    pub fn resource(&self, kind: MediaKind) -> Option<&ResourceHandle> {
        match kind {
            MediaKind::Image => self.image.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.video.as_ref(),
        }
    }

    /// Store `handle` for its media kind, returning the one it supersedes.
    pub fn replace_resource(&mut self, handle: ResourceHandle) -> Option<ResourceHandle> {
        let slot = match handle.kind() {
            MediaKind::Image => &mut self.image,
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        };
        slot.replace(handle)
    }

    pub fn take_resources(&mut self) -> Vec<ResourceHandle> {
        [self.image.take(), self.audio.take(), self.video.take()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Apply a user edit. Busy flags and resources are never touched here.
    pub fn handle_action(&mut self, action: &StateAction) {
        match action {
            StateAction::SetFestival(festival) => self.festival = *festival,
            StateAction::SetAudience(audience) => self.audience = *audience,
            StateAction::SetKeywords(keywords) => self.keywords = keywords.clone(),
            StateAction::EditText(text) => self.generated_text = text.clone(),
            StateAction::None => {}
        }
    }
}
