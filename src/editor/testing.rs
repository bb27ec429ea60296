//! In-memory chapter store standing in for the content service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::content::{Chapter, Id, UnitOrder, UnitPatch, UnitStatus, WorkUnit};
use crate::remote::{RemoteError, UnitService};

#[derive(Default)]
pub(crate) struct MemoryUnits {
    works: Mutex<HashMap<Id, Vec<Chapter>>>,
    next_id: AtomicUsize,
    failing_saves: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    reorder_calls: AtomicUsize,
    autosave_calls: AtomicUsize,
}

impl MemoryUnits {
    /// Work id the store reports as missing
    pub const MISSING_WORK: u64 = 404_404;

    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    pub fn stored(&self, work_id: &Id, unit_id: &Id) -> Option<Chapter> {
        let works = self.works.lock().unwrap();
        works.get(work_id)?.iter().find(|c| c.id() == unit_id).cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn reorder_calls(&self) -> usize {
        self.reorder_calls.load(Ordering::SeqCst)
    }

    pub fn autosave_calls(&self) -> usize {
        self.autosave_calls.load(Ordering::SeqCst)
    }

    fn check_work(work_id: &Id) -> Result<(), RemoteError> {
        if *work_id == Id::from(Self::MISSING_WORK) {
            return Err(RemoteError::NotFound(format!("works/{}", work_id)));
        }
        Ok(())
    }

    fn take_failure(&self) -> Result<(), RemoteError> {
        let failed = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(RemoteError::Timeout)
        } else {
            Ok(())
        }
    }

    fn with_chapter<T>(
        &self,
        work_id: &Id,
        unit_id: &Id,
        f: impl FnOnce(&mut Chapter) -> T,
    ) -> Result<T, RemoteError> {
        let mut works = self.works.lock().unwrap();
        works
            .get_mut(work_id)
            .and_then(|chapters| chapters.iter_mut().find(|c| c.id() == unit_id))
            .map(f)
            .ok_or_else(|| RemoteError::NotFound(format!("chapters/{}", unit_id)))
    }
}

#[async_trait]
impl UnitService for MemoryUnits {
    type Unit = Chapter;

    async fn list(&self, work_id: &Id) -> Result<Vec<Chapter>, RemoteError> {
        tokio::task::yield_now().await;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_work(work_id)?;
        let works = self.works.lock().unwrap();
        Ok(works.get(work_id).cloned().unwrap_or_default())
    }

    async fn get(&self, work_id: &Id, unit_id: &Id) -> Result<Chapter, RemoteError> {
        tokio::task::yield_now().await;
        self.with_chapter(work_id, unit_id, |c| c.clone())
    }

    async fn create(&self, work_id: &Id, title: &str, ordinal: u32) -> Result<Chapter, RemoteError> {
        tokio::task::yield_now().await;
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_work(work_id)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        let now = Utc::now();
        let chapter = Chapter {
            chapter_id: Id::from(id),
            work_id: work_id.clone(),
            title: title.to_string(),
            content: String::new(),
            order: ordinal,
            words: 0,
            status: UnitStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        let mut works = self.works.lock().unwrap();
        works.entry(work_id.clone()).or_default().push(chapter.clone());
        Ok(chapter)
    }

    async fn update(&self, work_id: &Id, unit_id: &Id, patch: &UnitPatch) -> Result<Chapter, RemoteError> {
        tokio::task::yield_now().await;
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if patch.content.is_some() {
            self.take_failure()?;
        }
        self.with_chapter(work_id, unit_id, |c| {
            if let Some(title) = &patch.title {
                c.title = title.clone();
            }
            if let Some(content) = &patch.content {
                c.set_content(content.clone());
            }
            if let Some(status) = patch.status {
                c.status = status;
            }
            if let Some(ordinal) = patch.ordinal {
                c.order = ordinal;
            }
            c.updated_at = Utc::now();
            c.clone()
        })
    }

    async fn delete(&self, work_id: &Id, unit_id: &Id) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        let mut works = self.works.lock().unwrap();
        let chapters = works
            .get_mut(work_id)
            .ok_or_else(|| RemoteError::NotFound(format!("works/{}", work_id)))?;
        chapters.retain(|c| c.id() != unit_id);
        Ok(())
    }

    async fn reorder(&self, work_id: &Id, orders: &[UnitOrder]) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        self.reorder_calls.fetch_add(1, Ordering::SeqCst);
        let mut works = self.works.lock().unwrap();
        let chapters = works
            .get_mut(work_id)
            .ok_or_else(|| RemoteError::NotFound(format!("works/{}", work_id)))?;
        for order in orders {
            if let Some(chapter) = chapters.iter_mut().find(|c| c.chapter_id == order.unit_id) {
                chapter.order = order.ordinal;
            }
        }
        Ok(())
    }

    async fn autosave(&self, work_id: &Id, unit_id: &Id, content: &str) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        self.autosave_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        self.with_chapter(work_id, unit_id, |c| c.set_content(content.to_string()))
    }
}
