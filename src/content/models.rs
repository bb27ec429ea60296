use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::text::{count_words, format_duration, format_number};

/// Identifier of a work, chapter, scene or character.
///
/// The backend issues unsigned integers while the web client passes them
/// around as strings, so both JSON forms are accepted. Canonical numeric ids
/// are written back as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_number(&self) -> Option<u64> {
        let n: u64 = self.0.parse().ok()?;
        (n.to_string() == self.0).then_some(n)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

/// Lifecycle status shared by chapters and scenes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Draft,
    Writing,
    Completed,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Writing => "writing",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Partial update of a unit. Unset fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UnitStatus>,
    #[serde(rename = "order", skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<u32>,
}

impl UnitPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.status.is_none() && self.ordinal.is_none()
    }
}

/// New ordinal assignment for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOrder {
    pub unit_id: Id,
    pub ordinal: u32,
}

/// Capability set the editor controller needs from an editable unit type.
///
/// Chapters and scenes differ only in wire shape; everything the controller
/// does goes through this trait so one implementation serves both.
pub trait WorkUnit:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Path segment under `/works/{workId}/`
    const RESOURCE: &'static str;
    /// Key naming the unit id inside reorder payloads
    const ORDER_KEY: &'static str;
    /// Human label used in notices ("chapter", "scene")
    const LABEL: &'static str;

    /// Body sent when creating a unit
    type Draft: Serialize + Send + Sync;

    fn draft(title: &str, ordinal: u32) -> Self::Draft;

    /// Body sent for a partial update
    fn patch_body(patch: &UnitPatch) -> serde_json::Value {
        serde_json::to_value(patch).unwrap_or_default()
    }

    fn id(&self) -> &Id;
    fn work_id(&self) -> &Id;
    fn ordinal(&self) -> u32;
    fn heading(&self) -> String;
    fn content(&self) -> &str;
    /// Replace the content and recompute the locally derived measure
    fn set_content(&mut self, content: String);
    /// Word count for chapters, estimated minutes for scenes
    fn measure(&self) -> u32;
    /// `measure` with its unit, for display
    fn measure_label(&self) -> String;
    fn status(&self) -> UnitStatus;
    fn updated_at(&self) -> DateTime<Utc>;
    /// Copy server-owned metadata from a save acknowledgement, keeping local content
    fn absorb_saved(&mut self, saved: &Self);
}

/// Novel chapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub chapter_id: Id,
    pub work_id: Id,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub order: u32,
    #[serde(default)]
    pub words: u32,
    #[serde(default)]
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDraft {
    pub title: String,
    pub order: u32,
}

impl WorkUnit for Chapter {
    const RESOURCE: &'static str = "chapters";
    const ORDER_KEY: &'static str = "chapterId";
    const LABEL: &'static str = "chapter";

    type Draft = ChapterDraft;

    fn draft(title: &str, ordinal: u32) -> ChapterDraft {
        ChapterDraft {
            title: title.to_string(),
            order: ordinal,
        }
    }

    fn id(&self) -> &Id {
        &self.chapter_id
    }

    fn work_id(&self) -> &Id {
        &self.work_id
    }

    fn ordinal(&self) -> u32 {
        self.order
    }

    fn heading(&self) -> String {
        self.title.clone()
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        self.words = count_words(&content);
        self.content = content;
    }

    fn measure(&self) -> u32 {
        self.words
    }

    fn measure_label(&self) -> String {
        format!("{} words", format_number(u64::from(self.words)))
    }

    fn status(&self) -> UnitStatus {
        self.status
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn absorb_saved(&mut self, saved: &Self) {
        self.words = saved.words;
        self.status = saved.status;
        self.updated_at = saved.updated_at;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SceneTime {
    #[default]
    Day,
    Night,
    Dawn,
    Dusk,
    Continuous,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SceneType {
    #[default]
    Interior,
    Exterior,
}

/// Screenplay scene
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub scene_id: Id,
    pub work_id: Id,
    #[serde(default)]
    pub scene_number: u32,
    pub location: String,
    #[serde(default)]
    pub time: SceneTime,
    #[serde(rename = "type", default)]
    pub scene_type: SceneType,
    #[serde(default)]
    pub content: String,
    /// Estimated running time in minutes
    #[serde(default)]
    pub duration: u32,
    pub order: u32,
    #[serde(default)]
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDraft {
    pub location: String,
    pub time: SceneTime,
    #[serde(rename = "type")]
    pub scene_type: SceneType,
    pub order: u32,
}

/// Roughly one screenplay page of dialogue and action per minute
const SCENE_WORDS_PER_MINUTE: u32 = 250;

impl WorkUnit for Scene {
    const RESOURCE: &'static str = "scenes";
    const ORDER_KEY: &'static str = "sceneId";
    const LABEL: &'static str = "scene";

    type Draft = SceneDraft;

    fn draft(title: &str, ordinal: u32) -> SceneDraft {
        SceneDraft {
            location: title.to_string(),
            time: SceneTime::default(),
            scene_type: SceneType::default(),
            order: ordinal,
        }
    }

    // Scenes have no title; the heading location plays that role.
    fn patch_body(patch: &UnitPatch) -> serde_json::Value {
        let mut body = serde_json::to_value(patch).unwrap_or_default();
        if let Some(map) = body.as_object_mut() {
            if let Some(title) = map.remove("title") {
                map.insert("location".to_string(), title);
            }
        }
        body
    }

    fn id(&self) -> &Id {
        &self.scene_id
    }

    fn work_id(&self) -> &Id {
        &self.work_id
    }

    fn ordinal(&self) -> u32 {
        self.order
    }

    fn heading(&self) -> String {
        let place = match self.scene_type {
            SceneType::Interior => "INT.",
            SceneType::Exterior => "EXT.",
        };
        let time = match self.time {
            SceneTime::Day => "DAY",
            SceneTime::Night => "NIGHT",
            SceneTime::Dawn => "DAWN",
            SceneTime::Dusk => "DUSK",
            SceneTime::Continuous => "CONTINUOUS",
        };
        format!("{} {} - {}", place, self.location.to_uppercase(), time)
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, content: String) {
        let words = count_words(&content);
        self.duration = words.div_ceil(SCENE_WORDS_PER_MINUTE);
        self.content = content;
    }

    fn measure(&self) -> u32 {
        self.duration
    }

    fn measure_label(&self) -> String {
        format_duration(self.duration)
    }

    fn status(&self) -> UnitStatus {
        self.status
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn absorb_saved(&mut self, saved: &Self) {
        self.duration = saved.duration;
        self.scene_number = saved.scene_number;
        self.status = saved.status;
        self.updated_at = saved.updated_at;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRelationship {
    pub target_character_id: Id,
    #[serde(default)]
    pub target_character_name: String,
    pub relationship: String,
}

/// Screenplay character
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub character_id: Id,
    pub work_id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<CharacterRelationship>,
    #[serde(default)]
    pub appearance_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<CharacterRelationship>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Novel,
    Screenplay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    #[default]
    Draft,
    Completed,
    Published,
}

/// A novel or screenplay owning chapters or scenes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub work_id: Id,
    #[serde(rename = "type")]
    pub work_type: WorkType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub status: WorkStatus,
    #[serde(default)]
    pub words: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_chapters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_scenes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkList {
    pub works: Vec<Work>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Query for the works listing
#[derive(Debug, Clone, Serialize)]
pub struct WorkQuery {
    #[serde(rename = "type")]
    pub work_type: String,
    pub status: String,
    pub page: u32,
    pub limit: u32,
    pub sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for WorkQuery {
    fn default() -> Self {
        Self {
            work_type: "all".to_string(),
            status: "all".to_string(),
            page: 1,
            limit: 20,
            sort: "updatedAt".to_string(),
            search: None,
        }
    }
}
