//! Greeting categories and per-request input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Festival the greeting is written for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FestivalType {
    #[default]
    SpringFestival,
    MidAutumn,
    NationalDay,
    LanternFestival,
    DragonBoat,
    LaborDay,
    NewYear,
    /// Company anniversary
    Anniversary,
}

impl FestivalType {
    pub const ALL: [FestivalType; 8] = [
        FestivalType::SpringFestival,
        FestivalType::MidAutumn,
        FestivalType::NationalDay,
        FestivalType::LanternFestival,
        FestivalType::DragonBoat,
        FestivalType::LaborDay,
        FestivalType::NewYear,
        FestivalType::Anniversary,
    ];

    /// Display label, also embedded verbatim in prompts and file names
    pub fn label(&self) -> &'static str {
        match self {
            FestivalType::SpringFestival => "春节",
            FestivalType::MidAutumn => "中秋节",
            FestivalType::NationalDay => "国庆节",
            FestivalType::LanternFestival => "元宵节",
            FestivalType::DragonBoat => "端午节",
            FestivalType::LaborDay => "五一劳动节",
            FestivalType::NewYear => "元旦",
            FestivalType::Anniversary => "企业周年庆",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            FestivalType::SpringFestival => "spring-festival",
            FestivalType::MidAutumn => "mid-autumn",
            FestivalType::NationalDay => "national-day",
            FestivalType::LanternFestival => "lantern-festival",
            FestivalType::DragonBoat => "dragon-boat",
            FestivalType::LaborDay => "labor-day",
            FestivalType::NewYear => "new-year",
            FestivalType::Anniversary => "anniversary",
        }
    }
}

impl fmt::Display for FestivalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FestivalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.id() == s || f.label() == s)
            .ok_or_else(|| format!("Unknown festival: {s}"))
    }
}

/// Who the greeting is addressed to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetAudience {
    Family,
    Friends,
    #[default]
    Colleagues,
    BusinessPartners,
    /// Government departments and officials
    Government,
    Customers,
}

impl TargetAudience {
    pub const ALL: [TargetAudience; 6] = [
        TargetAudience::Family,
        TargetAudience::Friends,
        TargetAudience::Colleagues,
        TargetAudience::BusinessPartners,
        TargetAudience::Government,
        TargetAudience::Customers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TargetAudience::Family => "家人",
            TargetAudience::Friends => "朋友",
            TargetAudience::Colleagues => "同事",
            TargetAudience::BusinessPartners => "商业伙伴",
            TargetAudience::Government => "政府部门/领导",
            TargetAudience::Customers => "广大客户",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            TargetAudience::Family => "family",
            TargetAudience::Friends => "friends",
            TargetAudience::Colleagues => "colleagues",
            TargetAudience::BusinessPartners => "business-partners",
            TargetAudience::Government => "government",
            TargetAudience::Customers => "customers",
        }
    }
}

impl fmt::Display for TargetAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TargetAudience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.id() == s || a.label() == s)
            .ok_or_else(|| format!("Unknown audience: {s}"))
    }
}

/// Immutable input captured when a text generation starts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GreetingRequest {
    pub festival: FestivalType,
    pub audience: TargetAudience,
    /// Free-text style hints, possibly empty
    pub keywords: String,
}

/// The four independent generation jobs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationTask {
    Text,
    Image,
    Audio,
    Video,
}

impl GenerationTask {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationTask::Text => "text",
            GenerationTask::Image => "image",
            GenerationTask::Audio => "audio",
            GenerationTask::Video => "video",
        }
    }
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of binary artifact held in the resource store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/png",
            MediaKind::Audio => "audio/wav",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Name offered when the artifact is downloaded
    pub fn download_name(&self, festival: FestivalType) -> String {
        match self {
            MediaKind::Image => format!("祝福-{}.png", festival.label()),
            MediaKind::Audio => "配音.wav".to_string(),
            MediaKind::Video => format!("祝福-{}.mp4", festival.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_festival_parse_by_id_and_label() {
        assert_eq!("mid-autumn".parse::<FestivalType>(), Ok(FestivalType::MidAutumn));
        assert_eq!("企业周年庆".parse::<FestivalType>(), Ok(FestivalType::Anniversary));
        assert!("halloween".parse::<FestivalType>().is_err());
    }

    #[test]
    fn test_audience_parse_by_id_and_label() {
        assert_eq!("government".parse::<TargetAudience>(), Ok(TargetAudience::Government));
        assert_eq!("政府部门/领导".parse::<TargetAudience>(), Ok(TargetAudience::Government));
        assert!("strangers".parse::<TargetAudience>().is_err());
    }

    #[test]
    fn test_defaults() {
        let request = GreetingRequest::default();
        assert_eq!(request.festival, FestivalType::SpringFestival);
        assert_eq!(request.audience, TargetAudience::Colleagues);
        assert!(request.keywords.is_empty());
    }

    #[test]
    fn test_download_names() {
        assert_eq!(MediaKind::Image.download_name(FestivalType::NewYear), "祝福-元旦.png");
        assert_eq!(MediaKind::Audio.download_name(FestivalType::NewYear), "配音.wav");
        assert_eq!(MediaKind::Video.mime_type(), "video/mp4");
    }
}
