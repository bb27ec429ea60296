use chrono::{DateTime, Utc};

/// The unit currently open in the editor plus its save bookkeeping.
///
/// Owned by the controller and never persisted.
#[derive(Debug, Clone)]
pub(crate) struct EditSession<U> {
    pub unit: U,
    /// Local content differs from the last acknowledged save
    pub dirty: bool,
    /// A save round-trip is outstanding
    pub saving: bool,
    /// Bumped on every local edit
    pub revision: u64,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl<U> EditSession<U> {
    pub fn new(unit: U) -> Self {
        Self {
            unit,
            dirty: false,
            saving: false,
            revision: 0,
            last_saved_at: None,
        }
    }
}

/// Snapshot of the controller published to views on every change
#[derive(Debug, Clone, PartialEq)]
pub struct EditorStatus<U> {
    pub current: Option<U>,
    pub units: Vec<U>,
    pub is_loading: bool,
    pub is_saving: bool,
    pub has_unsaved_changes: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl<U> Default for EditorStatus<U> {
    fn default() -> Self {
        Self {
            current: None,
            units: Vec::new(),
            is_loading: false,
            is_saving: false,
            has_unsaved_changes: false,
            last_saved_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing message emitted by manual operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Why a save request did not reach the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NothingLoaded,
    InFlight,
    Clean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { at: DateTime<Utc> },
    Skipped(SkipReason),
    /// Completed after the session it belonged to was replaced
    Stale,
    /// Autosave only; manual saves return the error instead
    Failed,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}
