//! AI writing operations.
//!
//! Each operation kind carries its own payload type and resolves its endpoint
//! through [`ROUTES`], so adding an operation means adding a variant, a
//! payload and a table row.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::content::{Id, WorkType};

use super::client::{RemoteClient, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiOperationKind {
    Continue,
    Polish,
    Expand,
    Rewrite,
    Outline,
    NovelToScreenplay,
    ScreenplayToNovel,
}

struct Route {
    kind: AiOperationKind,
    name: &'static str,
    path: &'static str,
}

/// Indexed by `AiOperationKind` discriminant
static ROUTES: [Route; 7] = [
    Route { kind: AiOperationKind::Continue, name: "continue", path: "ai/continue" },
    Route { kind: AiOperationKind::Polish, name: "polish", path: "ai/polish" },
    Route { kind: AiOperationKind::Expand, name: "expand", path: "ai/expand" },
    Route { kind: AiOperationKind::Rewrite, name: "rewrite", path: "ai/rewrite" },
    Route { kind: AiOperationKind::Outline, name: "outline", path: "ai/outline" },
    Route {
        kind: AiOperationKind::NovelToScreenplay,
        name: "novel_to_screenplay",
        path: "ai/convert/novel-to-screenplay",
    },
    Route {
        kind: AiOperationKind::ScreenplayToNovel,
        name: "screenplay_to_novel",
        path: "ai/convert/screenplay-to-novel",
    },
];

impl AiOperationKind {
    pub const ALL: [AiOperationKind; 7] = [
        Self::Continue,
        Self::Polish,
        Self::Expand,
        Self::Rewrite,
        Self::Outline,
        Self::NovelToScreenplay,
        Self::ScreenplayToNovel,
    ];

    fn route(self) -> &'static Route {
        &ROUTES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.route().name
    }

    pub fn path(self) -> &'static str {
        self.route().path
    }
}

impl fmt::Display for AiOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AiOperationKind {
    type Err = RemoteError;

    /// Accepts `novel_to_screenplay` as well as `novel-to-screenplay`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ROUTES
            .iter()
            .find(|r| r.name == normalized)
            .map(|r| r.kind)
            .ok_or_else(|| RemoteError::Invalid(format!("unknown AI operation '{}'", s)))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequest {
    pub work_id: Id,
    #[serde(rename = "type")]
    pub work_type: WorkType,
    /// Text preceding the continuation point
    pub context: String,
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolishRequest {
    pub work_id: Id,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpandRequest {
    pub work_id: Id,
    pub content: String,
    /// Target length after expansion
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub work_id: Id,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRequest {
    pub work_id: Id,
    pub topic: String,
    pub genre: String,
    pub num_chapters: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NovelToScreenplayRequest {
    pub work_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_scenes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScreenplayToNovelRequest {
    pub work_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_chapters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_per_chapter: Option<u32>,
}

/// An AI operation with the payload its endpoint requires
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AiOperation {
    Continue(ContinueRequest),
    Polish(PolishRequest),
    Expand(ExpandRequest),
    Rewrite(RewriteRequest),
    Outline(OutlineRequest),
    NovelToScreenplay(NovelToScreenplayRequest),
    ScreenplayToNovel(ScreenplayToNovelRequest),
}

const CONTINUE_LENGTH: RangeInclusive<u32> = 100..=5000;
const EXPAND_MIN_LENGTH: u32 = 100;
const OUTLINE_TOPIC_CHARS: RangeInclusive<usize> = 5..=500;
const OUTLINE_CHAPTERS: RangeInclusive<u32> = 1..=100;

fn require_text(field: &str, value: &str) -> Result<(), RemoteError> {
    if value.trim().is_empty() {
        return Err(RemoteError::Invalid(format!("{} must not be empty", field)));
    }
    Ok(())
}

impl AiOperation {
    pub fn kind(&self) -> AiOperationKind {
        match self {
            Self::Continue(_) => AiOperationKind::Continue,
            Self::Polish(_) => AiOperationKind::Polish,
            Self::Expand(_) => AiOperationKind::Expand,
            Self::Rewrite(_) => AiOperationKind::Rewrite,
            Self::Outline(_) => AiOperationKind::Outline,
            Self::NovelToScreenplay(_) => AiOperationKind::NovelToScreenplay,
            Self::ScreenplayToNovel(_) => AiOperationKind::ScreenplayToNovel,
        }
    }

    /// Check the payload against the limits the service enforces
    pub fn validate(&self) -> Result<(), RemoteError> {
        match self {
            Self::Continue(req) => {
                require_text("context", &req.context)?;
                if !CONTINUE_LENGTH.contains(&req.length) {
                    return Err(RemoteError::Invalid(format!(
                        "continuation length must be between {} and {}",
                        CONTINUE_LENGTH.start(),
                        CONTINUE_LENGTH.end()
                    )));
                }
            }
            Self::Polish(req) => require_text("content", &req.content)?,
            Self::Rewrite(req) => require_text("content", &req.content)?,
            Self::Expand(req) => {
                require_text("content", &req.content)?;
                if req.length < EXPAND_MIN_LENGTH {
                    return Err(RemoteError::Invalid(format!(
                        "expansion length must be at least {}",
                        EXPAND_MIN_LENGTH
                    )));
                }
            }
            Self::Outline(req) => {
                let topic_len = req.topic.trim().chars().count();
                if !OUTLINE_TOPIC_CHARS.contains(&topic_len) {
                    return Err(RemoteError::Invalid(format!(
                        "outline topic must be {} to {} characters",
                        OUTLINE_TOPIC_CHARS.start(),
                        OUTLINE_TOPIC_CHARS.end()
                    )));
                }
                require_text("genre", &req.genre)?;
                if !OUTLINE_CHAPTERS.contains(&req.num_chapters) {
                    return Err(RemoteError::Invalid(format!(
                        "chapter count must be between {} and {}",
                        OUTLINE_CHAPTERS.start(),
                        OUTLINE_CHAPTERS.end()
                    )));
                }
            }
            Self::NovelToScreenplay(_) | Self::ScreenplayToNovel(_) => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Accepted AI job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiTask {
    pub task_id: Id,
    pub status: TaskState,
    /// Seconds until the result is expected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiTaskStatus {
    pub task_id: Id,
    pub status: TaskState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RemoteClient {
    /// Validate and submit an AI operation
    pub async fn submit_ai(&self, operation: &AiOperation) -> Result<AiTask, RemoteError> {
        operation.validate()?;
        let kind = operation.kind();
        log::info!("AI: submitting {} for work {}", kind, work_id_of(operation));
        self.send_json(Method::POST, kind.path(), operation).await
    }

    pub async fn task_status(&self, task_id: &Id) -> Result<AiTaskStatus, RemoteError> {
        self.get(&format!("ai/tasks/{}", task_id)).await
    }

    /// Poll a task until it completes or fails, giving up after `deadline`
    pub async fn wait_for_task(
        &self,
        task_id: &Id,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Result<AiTaskStatus, RemoteError> {
        let started = tokio::time::Instant::now();
        loop {
            let status = self.task_status(task_id).await?;
            if status.status.is_terminal() {
                return Ok(status);
            }
            log::debug!("AI: task {} at {}%", task_id, status.progress);
            if started.elapsed() + poll_interval > deadline {
                return Err(RemoteError::Timeout);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

fn work_id_of(operation: &AiOperation) -> &Id {
    match operation {
        AiOperation::Continue(r) => &r.work_id,
        AiOperation::Polish(r) => &r.work_id,
        AiOperation::Expand(r) => &r.work_id,
        AiOperation::Rewrite(r) => &r.work_id,
        AiOperation::Outline(r) => &r.work_id,
        AiOperation::NovelToScreenplay(r) => &r.work_id,
        AiOperation::ScreenplayToNovel(r) => &r.work_id,
    }
}
