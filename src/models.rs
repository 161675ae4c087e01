use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Course difficulty. Unknown labels are kept verbatim so exact-match
/// filtering still works for them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Other(String),
}

impl Difficulty {
    pub fn as_str(&self) -> &str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Other(raw) => raw,
        }
    }
}

impl From<&str> for Difficulty {
    fn from(v: &str) -> Self {
        match v {
            "" | "beginner" => Difficulty::Beginner,
            "intermediate" => Difficulty::Intermediate,
            "advanced" => Difficulty::Advanced,
            other => Difficulty::Other(other.to_string()),
        }
    }
}

impl From<String> for Difficulty {
    fn from(v: String) -> Self {
        Difficulty::from(v.as_str())
    }
}

impl From<Difficulty> for String {
    fn from(d: Difficulty) -> Self {
        d.as_str().to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
}

impl CourseStatus {
    pub fn parse(v: &str) -> Self {
        match v {
            "published" => CourseStatus::Published,
            _ => CourseStatus::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tutor_id: Option<String>,
    // joined from users.display_name, used by search
    #[serde(default)]
    pub tutor_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub enrolled_count: u32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub creation_step: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[cfg(test)]
impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            category: default_category(),
            difficulty: Difficulty::default(),
            tutor_id: None,
            tutor_name: None,
            created_at: None,
            enrolled_count: 0,
            rating: 0.0,
            modules: Vec::new(),
            status: CourseStatus::default(),
            creation_step: None,
            updated_at: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Module {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_generated: bool,
    #[serde(default)]
    pub video_status: VideoStatus,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_topic: Option<String>,
    // fields written by other tools, preserved on write-back
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Module {
    #[cfg(test)]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Attaches a generated (or fallback) video. All completion fields are
    /// written together.
    pub fn apply(&mut self, update: &ModuleUpdate) {
        self.video_url = Some(update.video_url.clone());
        self.video_generated = true;
        self.video_status = VideoStatus::Completed;
        self.is_fallback = update.is_fallback;
        self.used_topic = Some(update.used_topic.clone());
    }
}

/// Result of one generation attempt for a module.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModuleUpdate {
    pub video_url: String,
    pub filename: String,
    pub is_fallback: bool,
    pub used_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tutor {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    Newest,
    Oldest,
    Popular,
    Rating,
    TitleAsc,
    TitleDesc,
}

/// Catalog query options. `None`, `""` and `"all"` all disable a criterion.
/// Without `sort_by` the input order is kept; store listings are already
/// newest first.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FilterConfig {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub category: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub tutor: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
}
