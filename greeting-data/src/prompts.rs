//! Prompt construction for each generation stage.

use crate::types::{FestivalType, GreetingRequest, TargetAudience};

const DEFAULT_KEYWORDS: &str = "温馨、大气、专业";

/// Tone tier used for narration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneProfile {
    /// Family and friends
    Warm,
    /// Government departments
    Solemn,
    Default,
}

/// Prebuilt voice plus the reading style passed to the speech model
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceProfile {
    pub tone: ToneProfile,
    pub voice_name: &'static str,
    pub style: &'static str,
}

impl VoiceProfile {
    pub fn for_audience(audience: TargetAudience) -> Self {
        match audience {
            TargetAudience::Family | TargetAudience::Friends => Self {
                tone: ToneProfile::Warm,
                voice_name: "Puck",
                style: "温馨、亲切、充满喜悦",
            },
            TargetAudience::Government => Self {
                tone: ToneProfile::Solemn,
                voice_name: "Charon",
                style: "庄重、得体、富有磁性",
            },
            _ => Self {
                tone: ToneProfile::Default,
                voice_name: "Kore",
                style: "大气、诚挚、节奏平缓",
            },
        }
    }
}

pub fn greeting_prompt(request: &GreetingRequest) -> String {
    let festival = request.festival.label();
    let audience = request.audience.label();
    let keywords = match request.keywords.trim() {
        "" => DEFAULT_KEYWORDS,
        k => k,
    };

    format!(
        "你是一名专业的企业行政公关专家。请为{festival}生成一段给{audience}的祝福语。

核心要求：
1. 【必须包含称呼】：祝福语开头必须有针对“{audience}”的正式或亲切称呼。
2. 【身份契合】：内容必须精准针对“{audience}”这一群体。
3. 【风格匹配】：
   - 商业伙伴/政府部门：庄重、得体、专业。
   - 同事/客户：大气、振奋、真诚。
   - 家人/朋友：温馨、活泼、亲切。
4. 关键词建议：{keywords}。

请直接输出祝福语正文，不要包含任何多余的开头语或解释。"
    )
}

pub fn image_prompt(text: &str, festival: FestivalType) -> String {
    format!(
        "A high-quality greeting card design for {}. \
The theme should be elegant and festive. \
Context: {text}. \
No text in the image, just artistic background, symbolic elements of the festival. \
Professional corporate aesthetic. 16:9 aspect ratio.",
        festival.label()
    )
}

pub fn speech_prompt(text: &str, festival: FestivalType, voice: &VoiceProfile) -> String {
    format!(
        "请用{}的语气朗读以下{}祝福语：\n{text}",
        voice.style,
        festival.label()
    )
}

pub fn video_prompt(text: &str, festival: FestivalType) -> String {
    format!(
        "A 15-second elegant greeting video for {}. Cinematic animation. {text}. Professional corporate aesthetic.",
        festival.label()
    )
}
