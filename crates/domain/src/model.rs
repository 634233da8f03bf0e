//! Catalog records: programs, terms, lessons and their media assets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AssetId, LessonId, ProgramId, TermId};
use crate::status::{EntityKind, Status};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Program
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Top-level course containing ordered terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub language_primary: String,
    #[serde(default)]
    pub languages_available: Vec<String>,
    #[serde(default)]
    pub status: Status,
    /// Set on the first transition to published and never rewritten.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Program {
    pub fn new(title: impl Into<String>, language_primary: impl Into<String>) -> Self {
        let language_primary = language_primary.into();
        Self {
            id: ProgramId::new(),
            title: title.into(),
            description: None,
            languages_available: vec![language_primary.clone()],
            language_primary,
            status: Status::Draft,
            published_at: None,
            created_at: Utc::now(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Term
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ordered grouping of lessons. `(program_id, term_number)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub program_id: ProgramId,
    pub term_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lesson
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Video,
    Article,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Article => "article",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "video" => Ok(ContentType::Video),
            "article" => Ok(ContentType::Article),
            other => Err(format!(
                "invalid content type '{other}'. valid values: video, article"
            )),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf content unit. `(term_id, lesson_number)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub term_id: TermId,
    pub lesson_number: u32,
    pub title: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub is_paid: bool,
    pub content_language_primary: String,
    #[serde(default)]
    pub content_languages_available: Vec<String>,
    #[serde(default)]
    pub content_urls_by_language: BTreeMap<String, String>,
    #[serde(default)]
    pub subtitle_languages: Vec<String>,
    #[serde(default)]
    pub subtitle_urls_by_language: BTreeMap<String, String>,
    #[serde(default)]
    pub status: Status,
    /// Only meaningful while `status == Scheduled`; inert afterwards.
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
    /// Set on the first transition to published and never rewritten.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetVariant {
    Portrait,
    Landscape,
    Square,
    Banner,
}

impl AssetVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetVariant::Portrait => "portrait",
            AssetVariant::Landscape => "landscape",
            AssetVariant::Square => "square",
            AssetVariant::Banner => "banner",
        }
    }
}

impl FromStr for AssetVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "portrait" => Ok(AssetVariant::Portrait),
            "landscape" => Ok(AssetVariant::Landscape),
            "square" => Ok(AssetVariant::Square),
            "banner" => Ok(AssetVariant::Banner),
            other => Err(format!(
                "invalid asset variant '{other}'. valid values: portrait, landscape, square, banner"
            )),
        }
    }
}

impl fmt::Display for AssetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Poster` belongs to programs, `Thumbnail` to lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Poster,
    Thumbnail,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Poster => "poster",
            AssetType::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssetOwner {
    Program(ProgramId),
    Lesson(LessonId),
}

impl AssetOwner {
    /// The asset type an owner of this kind carries.
    pub fn asset_type(self) -> AssetType {
        match self {
            AssetOwner::Program(_) => AssetType::Poster,
            AssetOwner::Lesson(_) => AssetType::Thumbnail,
        }
    }
}

impl fmt::Display for AssetOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetOwner::Program(id) => write!(f, "program {id}"),
            AssetOwner::Lesson(id) => write!(f, "lesson {id}"),
        }
    }
}

/// A poster or thumbnail. Unique per `(owner, language, variant, asset_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub owner: AssetOwner,
    pub language: String,
    pub variant: AssetVariant,
    pub asset_type: AssetType,
    pub url: String,
}

impl Asset {
    pub fn new(
        owner: AssetOwner,
        language: impl Into<String>,
        variant: AssetVariant,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: AssetId::new(),
            owner,
            language: language.into(),
            variant,
            asset_type: owner.asset_type(),
            url: url.into(),
        }
    }

    pub fn unique_key(&self) -> (AssetOwner, &str, AssetVariant, AssetType) {
        (self.owner, self.language.as_str(), self.variant, self.asset_type)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Publish target
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An entity that can be moved to published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PublishTarget {
    Program(ProgramId),
    Lesson(LessonId),
}

impl PublishTarget {
    pub fn kind(self) -> EntityKind {
        match self {
            PublishTarget::Program(_) => EntityKind::Program,
            PublishTarget::Lesson(_) => EntityKind::Lesson,
        }
    }

    pub fn id_string(self) -> String {
        match self {
            PublishTarget::Program(id) => id.to_string(),
            PublishTarget::Lesson(id) => id.to_string(),
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id_string())
    }
}

impl From<PublishTarget> for AssetOwner {
    fn from(target: PublishTarget) -> Self {
        match target {
            PublishTarget::Program(id) => AssetOwner::Program(id),
            PublishTarget::Lesson(id) => AssetOwner::Lesson(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_follows_owner() {
        let poster = Asset::new(
            AssetOwner::Program(ProgramId::new()),
            "en",
            AssetVariant::Portrait,
            "https://example.com/p.jpg",
        );
        assert_eq!(poster.asset_type, AssetType::Poster);

        let thumb = Asset::new(
            AssetOwner::Lesson(LessonId::new()),
            "en",
            AssetVariant::Banner,
            "https://example.com/t.jpg",
        );
        assert_eq!(thumb.asset_type, AssetType::Thumbnail);
    }

    #[test]
    fn variant_parses_from_form_values() {
        assert_eq!("Landscape".parse::<AssetVariant>().unwrap(), AssetVariant::Landscape);
        assert!("wide".parse::<AssetVariant>().is_err());
    }

    #[test]
    fn content_type_parses_and_displays() {
        assert_eq!(" Article".parse::<ContentType>().unwrap(), ContentType::Article);
        assert_eq!(ContentType::Video.to_string(), "video");
        assert!("podcast".parse::<ContentType>().is_err());
    }

    #[test]
    fn lesson_deserializes_with_optional_fields_missing() {
        let json = serde_json::json!({
            "id": LessonId::new(),
            "term_id": TermId::new(),
            "lesson_number": 2,
            "title": "Variables",
            "content_language_primary": "en",
            "created_at": Utc::now(),
        });
        let lesson: Lesson = serde_json::from_value(json).unwrap();
        assert_eq!(lesson.status, Status::Draft);
        assert_eq!(lesson.content_type, ContentType::Video);
        assert!(lesson.publish_at.is_none());
    }

    #[test]
    fn publish_target_display() {
        let id = ProgramId::new();
        assert_eq!(PublishTarget::Program(id).to_string(), format!("program {id}"));
    }
}
