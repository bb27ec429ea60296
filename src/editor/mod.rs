//! Editor synchronization: the open unit, its dirty state, and the saves
//! that reconcile it with the content service.

pub mod autosave;
pub mod error;

mod controller;
mod session;
#[cfg(test)]
mod testing;

pub use autosave::{start_autosave, AutoSaveMessage, AutoSaveScheduler};
pub use controller::{validate_title, EditorController, MAX_TITLE_CHARS};
pub use error::{EditorError, ErrorKind};
pub use session::{EditorStatus, Notice, NoticeLevel, SaveOutcome, SkipReason};
