use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{broadcast, watch};

use crate::content::{Id, UnitOrder, UnitPatch, WorkUnit};
use crate::remote::UnitService;

use super::error::EditorError;
use super::session::{EditSession, EditorStatus, Notice, SaveOutcome, SkipReason};

/// Longest title the content service accepts
pub const MAX_TITLE_CHARS: usize = 200;

const NOTICE_BUFFER: usize = 32;

struct EditorState<U> {
    /// Work whose units are held in `units`
    work_id: Option<Id>,
    units: Vec<U>,
    session: Option<EditSession<U>>,
    pending_loads: usize,
    /// Bumped whenever the session is replaced; save completions check it
    generation: u64,
    /// Bumped on reset; fetch completions check it
    epoch: u64,
}

impl<U> Default for EditorState<U> {
    fn default() -> Self {
        Self {
            work_id: None,
            units: Vec::new(),
            session: None,
            pending_loads: 0,
            generation: 0,
            epoch: 0,
        }
    }
}

impl<U: WorkUnit> EditorState<U> {
    fn project(&self) -> EditorStatus<U> {
        let session = self.session.as_ref();
        EditorStatus {
            current: session.map(|s| s.unit.clone()),
            units: self.units.clone(),
            is_loading: self.pending_loads > 0,
            is_saving: session.is_some_and(|s| s.saving),
            has_unsaved_changes: session.is_some_and(|s| s.dirty),
            last_saved_at: session.and_then(|s| s.last_saved_at),
        }
    }

    fn holds_work(&self, work_id: &Id) -> bool {
        self.work_id.as_ref() == Some(work_id)
    }

    fn is_current(&self, work_id: &Id, unit_id: &Id) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.unit.work_id() == work_id && s.unit.id() == unit_id)
    }

    fn replace_entry(&mut self, unit: &U) {
        if !self.holds_work(unit.work_id()) {
            return;
        }
        if let Some(entry) = self.units.iter_mut().find(|u| u.id() == unit.id()) {
            *entry = unit.clone();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SaveMode {
    Manual,
    Auto,
}

/// What a save round-trip needs from the session, captured at start
struct SaveTicket {
    generation: u64,
    work_id: Id,
    unit_id: Id,
    content: String,
    revision: u64,
}

/// Tracks the unit being edited and reconciles local edits with the
/// content service.
///
/// Cheap to clone; clones share state. The state lock is never held across
/// an await, and at most one save is in flight per session.
pub struct EditorController<S: UnitService> {
    service: Arc<S>,
    state: Arc<Mutex<EditorState<S::Unit>>>,
    status: Arc<watch::Sender<EditorStatus<S::Unit>>>,
    notices: broadcast::Sender<Notice>,
}

impl<S: UnitService> Clone for EditorController<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            state: Arc::clone(&self.state),
            status: Arc::clone(&self.status),
            notices: self.notices.clone(),
        }
    }
}

/// Trim a title and check it against the service's limits
pub fn validate_title(title: &str) -> Result<&str, EditorError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(EditorError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(EditorError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title)
}

impl<S: UnitService> EditorController<S> {
    /// A controller with nothing loaded
    pub fn new(service: S) -> Self {
        Self::with_service(Arc::new(service))
    }

    pub fn with_service(service: Arc<S>) -> Self {
        let (status, _) = watch::channel(EditorStatus::default());
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            service,
            state: Arc::new(Mutex::new(EditorState::default())),
            status: Arc::new(status),
            notices,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn lock(&self) -> MutexGuard<'_, EditorState<S::Unit>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &EditorState<S::Unit>) {
        self.status.send_replace(state.project());
    }

    fn notify(&self, notice: Notice) {
        // No listeners is fine
        let _ = self.notices.send(notice);
    }

    fn fail(&self, action: &str, err: EditorError) -> EditorError {
        log::warn!("Editor: {} failed: {}", action, err);
        self.notify(Notice::error(format!("Failed to {}: {}", action, err)));
        err
    }

    fn begin_fetch(&self) -> u64 {
        let mut state = self.lock();
        state.pending_loads += 1;
        self.publish(&state);
        state.epoch
    }

    fn end_fetch(state: &mut EditorState<S::Unit>) {
        state.pending_loads = state.pending_loads.saturating_sub(1);
    }

    // --- Queries ---

    pub fn current_unit(&self) -> Option<S::Unit> {
        self.lock().session.as_ref().map(|s| s.unit.clone())
    }

    pub fn units(&self) -> Vec<S::Unit> {
        self.lock().units.clone()
    }

    pub fn work_id(&self) -> Option<Id> {
        self.lock().work_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().pending_loads > 0
    }

    pub fn is_saving(&self) -> bool {
        self.lock().session.as_ref().is_some_and(|s| s.saving)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.lock().session.as_ref().is_some_and(|s| s.dirty)
    }

    pub fn last_saved_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.lock().session.as_ref().and_then(|s| s.last_saved_at)
    }

    pub fn status(&self) -> EditorStatus<S::Unit> {
        self.lock().project()
    }

    /// Status updates; the receiver sees the latest snapshot
    pub fn subscribe(&self) -> watch::Receiver<EditorStatus<S::Unit>> {
        self.status.subscribe()
    }

    /// Success and error messages from manual operations
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    // --- Operations ---

    /// Open a unit, discarding whatever was open before.
    ///
    /// Returns `Ok(None)` when another load or a reset replaced this one
    /// before it completed.
    pub async fn load_unit(&self, work_id: &Id, unit_id: &Id) -> Result<Option<S::Unit>, EditorError> {
        let generation = {
            let mut state = self.lock();
            if let Some(previous) = &state.session {
                if previous.dirty {
                    log::warn!(
                        "Editor: discarding unsaved changes to {} {}",
                        S::Unit::LABEL,
                        previous.unit.id()
                    );
                }
            }
            state.generation += 1;
            state.session = None;
            state.pending_loads += 1;
            self.publish(&state);
            state.generation
        };

        let result = self.service.get(work_id, unit_id).await;

        let mut state = self.lock();
        Self::end_fetch(&mut state);
        if state.generation != generation {
            self.publish(&state);
            log::debug!("Editor: dropping superseded load of {} {}", S::Unit::LABEL, unit_id);
            return Ok(None);
        }

        match result {
            Ok(unit) => {
                state.replace_entry(&unit);
                state.session = Some(EditSession::new(unit.clone()));
                self.publish(&state);
                log::info!("Editor: loaded {} {}", S::Unit::LABEL, unit_id);
                Ok(Some(unit))
            }
            Err(e) => {
                self.publish(&state);
                drop(state);
                Err(self.fail(&format!("load {}", S::Unit::LABEL), e.into()))
            }
        }
    }

    /// Fetch the units of a work in ordinal order. The open unit is untouched.
    pub async fn list_units(&self, work_id: &Id) -> Result<Vec<S::Unit>, EditorError> {
        let epoch = self.begin_fetch();
        let result = self.service.list(work_id).await;

        let mut state = self.lock();
        Self::end_fetch(&mut state);
        match result {
            Ok(mut units) => {
                units.sort_by_key(|u| u.ordinal());
                if state.epoch == epoch {
                    state.work_id = Some(work_id.clone());
                    state.units = units.clone();
                }
                self.publish(&state);
                log::debug!("Editor: listed {} {}s of work {}", units.len(), S::Unit::LABEL, work_id);
                Ok(units)
            }
            Err(e) => {
                self.publish(&state);
                drop(state);
                Err(self.fail(&format!("list {}s", S::Unit::LABEL), e.into()))
            }
        }
    }

    /// Units of `work_id`, from the local list when it holds that work
    async fn known_units(&self, work_id: &Id) -> Result<Vec<S::Unit>, EditorError> {
        {
            let state = self.lock();
            if state.holds_work(work_id) {
                return Ok(state.units.clone());
            }
        }
        self.list_units(work_id).await
    }

    /// Append a new unit after the last one, optionally opening it
    pub async fn create_unit(&self, work_id: &Id, title: &str, open: bool) -> Result<S::Unit, EditorError> {
        let action = format!("create {}", S::Unit::LABEL);
        let title = validate_title(title).map_err(|e| self.fail(&action, e))?;

        let existing = self.known_units(work_id).await?;
        // Next ordinal; stays unique when earlier deletes left gaps
        let last = existing.iter().map(|u| u.ordinal()).max().unwrap_or(0);
        let ordinal = (existing.len() as u32).max(last) + 1;

        let unit = self
            .service
            .create(work_id, title, ordinal)
            .await
            .map_err(|e| self.fail(&action, e.into()))?;

        {
            let mut state = self.lock();
            if state.holds_work(work_id) {
                state.units.push(unit.clone());
                state.units.sort_by_key(|u| u.ordinal());
            }
            if open {
                state.generation += 1;
                state.session = Some(EditSession::new(unit.clone()));
            }
            self.publish(&state);
        }

        log::info!("Editor: created {} {} at position {}", S::Unit::LABEL, unit.id(), ordinal);
        self.notify(Notice::success(format!("Created {} \"{}\"", S::Unit::LABEL, title)));
        Ok(unit)
    }

    /// Replace the open unit's content locally. Never touches the network.
    pub fn mutate_content(&self, content: impl Into<String>) -> Result<(), EditorError> {
        let mut state = self.lock();
        let Some(session) = state.session.as_mut() else {
            log::warn!("Editor: edit ignored, no {} is loaded", S::Unit::LABEL);
            return Err(EditorError::NoUnitLoaded);
        };
        session.unit.set_content(content.into());
        session.dirty = true;
        session.revision += 1;
        self.publish(&state);
        Ok(())
    }

    /// Explicit save. Skips when clean, when nothing is loaded, or while
    /// another save is in flight.
    pub async fn save(&self) -> Result<SaveOutcome, EditorError> {
        self.persist(SaveMode::Manual).await
    }

    /// Save until nothing is unsaved, waiting out any save already in
    /// flight. Returns whether the session ended clean.
    ///
    /// `Ok(false)` means the session was replaced before its edits landed.
    pub async fn flush(&self) -> Result<bool, EditorError> {
        let mut status = self.subscribe();
        loop {
            match self.save().await? {
                SaveOutcome::Skipped(SkipReason::InFlight) => {
                    let settled = status.wait_for(|s| !s.is_saving).await.is_ok();
                    if !settled {
                        return Ok(false);
                    }
                }
                SaveOutcome::Stale | SaveOutcome::Failed => return Ok(false),
                SaveOutcome::Saved { .. } | SaveOutcome::Skipped(_) => {}
            }
            if !self.has_unsaved_changes() {
                return Ok(true);
            }
        }
    }

    /// Timer-driven save. Failures are logged, never surfaced.
    pub async fn autosave_tick(&self) -> SaveOutcome {
        match self.persist(SaveMode::Auto).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Autosave: {}", e);
                SaveOutcome::Failed
            }
        }
    }

    async fn persist(&self, mode: SaveMode) -> Result<SaveOutcome, EditorError> {
        let ticket = {
            let mut state = self.lock();
            let generation = state.generation;
            let Some(session) = state.session.as_mut() else {
                if let SaveMode::Manual = mode {
                    log::warn!("Editor: save ignored, no {} is loaded", S::Unit::LABEL);
                }
                return Ok(SaveOutcome::Skipped(SkipReason::NothingLoaded));
            };
            if session.saving {
                log::debug!("Editor: save already in flight, dropping request");
                return Ok(SaveOutcome::Skipped(SkipReason::InFlight));
            }
            if !session.dirty {
                return Ok(SaveOutcome::Skipped(SkipReason::Clean));
            }
            session.saving = true;
            let ticket = SaveTicket {
                generation,
                work_id: session.unit.work_id().clone(),
                unit_id: session.unit.id().clone(),
                content: session.unit.content().to_string(),
                revision: session.revision,
            };
            self.publish(&state);
            ticket
        };

        let result = match mode {
            SaveMode::Manual => self
                .service
                .update(&ticket.work_id, &ticket.unit_id, &UnitPatch::content(ticket.content))
                .await
                .map(Some),
            SaveMode::Auto => self
                .service
                .autosave(&ticket.work_id, &ticket.unit_id, &ticket.content)
                .await
                .map(|_| None),
        };

        let mut state = self.lock();
        if state.generation != ticket.generation {
            log::debug!(
                "Editor: ignoring save completion for replaced {} {}",
                S::Unit::LABEL,
                ticket.unit_id
            );
            return Ok(SaveOutcome::Stale);
        }
        let Some(session) = state.session.as_mut() else {
            return Ok(SaveOutcome::Stale);
        };
        session.saving = false;

        match result {
            Ok(saved) => {
                let at = Utc::now();
                // Edits made during the round-trip keep the session dirty
                if session.revision == ticket.revision {
                    session.dirty = false;
                    if let Some(saved) = &saved {
                        session.unit.absorb_saved(saved);
                    }
                }
                session.last_saved_at = Some(at);
                let snapshot = session.unit.clone();
                state.replace_entry(&snapshot);
                self.publish(&state);
                drop(state);

                match mode {
                    SaveMode::Manual => {
                        log::info!("Editor: saved {} {}", S::Unit::LABEL, ticket.unit_id);
                        self.notify(Notice::success("Saved"));
                    }
                    SaveMode::Auto => {
                        log::debug!("Autosave: saved {} {}", S::Unit::LABEL, ticket.unit_id)
                    }
                }
                Ok(SaveOutcome::Saved { at })
            }
            Err(e) => {
                self.publish(&state);
                drop(state);
                let err = EditorError::from(e);
                match mode {
                    SaveMode::Manual => Err(self.fail("save", err)),
                    SaveMode::Auto => Err(err),
                }
            }
        }
    }

    /// Persist metadata changes (title, status) for one unit.
    ///
    /// Positions only move through [`reorder`](Self::reorder), which keeps
    /// ordinals unique within the work.
    pub async fn update_unit(
        &self,
        work_id: &Id,
        unit_id: &Id,
        patch: &UnitPatch,
    ) -> Result<S::Unit, EditorError> {
        let action = format!("update {}", S::Unit::LABEL);
        if patch.is_empty() {
            return Err(self.fail(&action, EditorError::validation("nothing to update")));
        }
        if patch.ordinal.is_some() {
            return Err(self.fail(&action, EditorError::validation("use reorder to change positions")));
        }
        if let Some(title) = &patch.title {
            validate_title(title).map_err(|e| self.fail(&action, e))?;
        }

        let saved = self
            .service
            .update(work_id, unit_id, patch)
            .await
            .map_err(|e| self.fail(&action, e.into()))?;

        {
            let mut state = self.lock();
            state.replace_entry(&saved);
            state.units.sort_by_key(|u| u.ordinal());
            if state.is_current(work_id, unit_id) {
                if let Some(session) = state.session.as_mut() {
                    let mut next = saved.clone();
                    if session.dirty {
                        next.set_content(session.unit.content().to_string());
                    }
                    session.unit = next;
                }
            }
            self.publish(&state);
        }

        self.notify(Notice::success(format!("Updated {}", S::Unit::LABEL)));
        Ok(saved)
    }

    /// Assign ordinals 1..=n in the given order, then refetch the list.
    ///
    /// `unit_ids` must name every unit of the work exactly once.
    pub async fn reorder(&self, work_id: &Id, unit_ids: &[Id]) -> Result<Vec<S::Unit>, EditorError> {
        let action = format!("reorder {}s", S::Unit::LABEL);
        let existing = self.known_units(work_id).await?;
        Self::check_order(&existing, unit_ids).map_err(|e| self.fail(&action, e))?;

        let orders: Vec<UnitOrder> = unit_ids
            .iter()
            .enumerate()
            .map(|(i, id)| UnitOrder {
                unit_id: id.clone(),
                ordinal: i as u32 + 1,
            })
            .collect();

        self.service
            .reorder(work_id, &orders)
            .await
            .map_err(|e| self.fail(&action, e.into()))?;

        let units = self.list_units(work_id).await?;
        log::info!("Editor: reordered {} {}s in work {}", orders.len(), S::Unit::LABEL, work_id);
        self.notify(Notice::success(format!("Reordered {}s", S::Unit::LABEL)));
        Ok(units)
    }

    fn check_order(existing: &[S::Unit], unit_ids: &[Id]) -> Result<(), EditorError> {
        if unit_ids.is_empty() {
            return Err(EditorError::validation("order must not be empty"));
        }
        let mut seen = HashSet::new();
        for id in unit_ids {
            if !seen.insert(id) {
                return Err(EditorError::validation(format!("{} listed twice", id)));
            }
            if !existing.iter().any(|u| u.id() == id) {
                return Err(EditorError::validation(format!(
                    "{} {} does not belong to this work",
                    S::Unit::LABEL,
                    id
                )));
            }
        }
        if unit_ids.len() != existing.len() {
            return Err(EditorError::validation(format!(
                "order must list all {} {}s",
                existing.len(),
                S::Unit::LABEL
            )));
        }
        Ok(())
    }

    /// Delete a unit. The caller is responsible for confirming with the user.
    pub async fn delete_unit(&self, work_id: &Id, unit_id: &Id) -> Result<(), EditorError> {
        self.service
            .delete(work_id, unit_id)
            .await
            .map_err(|e| self.fail(&format!("delete {}", S::Unit::LABEL), e.into()))?;

        {
            let mut state = self.lock();
            if state.holds_work(work_id) {
                state.units.retain(|u| u.id() != unit_id);
            }
            if state.is_current(work_id, unit_id) {
                state.session = None;
                state.generation += 1;
            }
            self.publish(&state);
        }

        log::info!("Editor: deleted {} {}", S::Unit::LABEL, unit_id);
        self.notify(Notice::success(format!("Deleted {}", S::Unit::LABEL)));
        Ok(())
    }

    /// Discard the session and the list. In-flight completions are ignored.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.epoch += 1;
        state.session = None;
        state.units.clear();
        state.work_id = None;
        self.publish(&state);
    }
}
