use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::remote::UnitService;

use super::controller::EditorController;
use super::error::EditorError;

/// Messages to control the autosave scheduler
#[derive(Debug)]
pub enum AutoSaveMessage {
    /// Run a tick now instead of waiting for the timer
    SaveNow,
    Shutdown,
}

/// Handle for the periodic autosave task. Dropping it stops the task.
pub struct AutoSaveScheduler {
    sender: mpsc::Sender<AutoSaveMessage>,
    handle: Option<JoinHandle<()>>,
}

impl AutoSaveScheduler {
    pub fn save_now(&self) {
        let _ = self.sender.try_send(AutoSaveMessage::SaveNow);
    }

    pub fn shutdown(&self) {
        let _ = self.sender.try_send(AutoSaveMessage::Shutdown);
    }

    /// Shut down and wait for an in-progress tick to finish
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Start ticking `controller.autosave_tick()` every `interval`.
///
/// The first tick fires one full interval after start. Ticks that would
/// pile up behind a slow save are skipped. A zero interval is rejected.
pub fn start_autosave<S: UnitService>(
    controller: EditorController<S>,
    interval: Duration,
) -> Result<AutoSaveScheduler, EditorError> {
    if interval.is_zero() {
        return Err(EditorError::validation("autosave interval must be greater than zero"));
    }
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(autosave_loop(controller, interval, rx));

    Ok(AutoSaveScheduler {
        sender: tx,
        handle: Some(handle),
    })
}

async fn autosave_loop<S: UnitService>(
    controller: EditorController<S>,
    interval: Duration,
    mut rx: mpsc::Receiver<AutoSaveMessage>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    log::info!("Autosave: started, every {}ms", interval.as_millis());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                controller.autosave_tick().await;
            }
            msg = rx.recv() => match msg {
                Some(AutoSaveMessage::SaveNow) => {
                    controller.autosave_tick().await;
                }
                Some(AutoSaveMessage::Shutdown) | None => break,
            },
        }
    }

    log::info!("Autosave: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Id, WorkUnit};
    use crate::editor::error::ErrorKind;
    use crate::editor::testing::MemoryUnits;

    async fn loaded() -> EditorController<MemoryUnits> {
        let controller = EditorController::new(MemoryUnits::default());
        let work = Id::from(1);
        let chapter = controller.create_unit(&work, "Opening", false).await.unwrap();
        controller.load_unit(&work, chapter.id()).await.unwrap();
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_save_only_dirty_content() {
        let controller = loaded().await;
        controller.mutate_content("draft").unwrap();
        let scheduler = start_autosave(controller.clone(), Duration::from_secs(30)).unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(controller.service().autosave_calls(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(controller.service().autosave_calls(), 1);
        assert!(!controller.has_unsaved_changes());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(controller.service().autosave_calls(), 1);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_retries_on_next() {
        let controller = loaded().await;
        controller.mutate_content("draft").unwrap();
        controller.service().fail_next_saves(1);
        let scheduler = start_autosave(controller.clone(), Duration::from_secs(30)).unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(controller.service().autosave_calls(), 1);
        assert!(controller.has_unsaved_changes());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(controller.service().autosave_calls(), 2);
        assert!(!controller.has_unsaved_changes());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_now_and_shutdown() {
        let controller = loaded().await;
        controller.mutate_content("draft").unwrap();
        let scheduler = start_autosave(controller.clone(), Duration::from_secs(30)).unwrap();

        scheduler.save_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(controller.service().autosave_calls(), 1);

        scheduler.stop().await;
        controller.mutate_content("after stop").unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(controller.service().autosave_calls(), 1);
        assert!(controller.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let controller = loaded().await;
        let err = start_autosave(controller, Duration::ZERO).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
