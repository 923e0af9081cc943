use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::info;

use crate::clipboard::{ClipboardService, Paster};
use crate::db::{Database, HistoryEntry, Settings};
use crate::error::{AppError, AppResult};
use crate::listener::{ClipboardListener, ClipboardWatcher, ListenerState};
use crate::services::clip_engine::ClipEngine;
use crate::services::prune::enforce_retention;
use crate::services::session::HistorySession;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub general: Vec<HistoryEntry>,
    pub favorites: Vec<HistoryEntry>,
}

pub struct HistoryController {
    db: Arc<Database>,
    clipboard: Arc<dyn ClipboardService>,
    paster: Arc<dyn Paster>,
    listener: ClipboardListener,
    settings: Mutex<Settings>,
}

impl HistoryController {
    pub fn new(
        db: Arc<Database>,
        clipboard: Arc<dyn ClipboardService>,
        paster: Arc<dyn Paster>,
        watcher: Arc<dyn ClipboardWatcher>,
    ) -> AppResult<Self> {
        let settings = db.get_settings()?;
        enforce_retention(&db, settings.max_elements)?;

        let engine = Arc::new(ClipEngine::new(db.clone(), clipboard.clone()));
        let listener = ClipboardListener::new(watcher, engine);

        Ok(Self {
            db,
            clipboard,
            paster,
            listener,
            settings: Mutex::new(settings),
        })
    }

    pub fn start_monitoring(&self, as_thread: bool) -> AppResult<()> {
        self.listener.start_monitoring(as_thread)?;
        Ok(())
    }

    pub fn stop_monitoring(&self) -> AppResult<()> {
        self.listener.stop_monitoring()?;
        Ok(())
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    pub fn open_session(&self) -> AppResult<HistorySession> {
        let settings = self.db.get_settings()?;
        *self.lock_settings()? = settings;
        HistorySession::new(
            self.db.clone(),
            self.clipboard.clone(),
            self.paster.clone(),
            settings,
        )
    }

    pub fn settings(&self) -> AppResult<Settings> {
        Ok(*self.lock_settings()?)
    }

    pub fn update_settings(&self, settings: Settings) -> AppResult<Settings> {
        if settings.max_elements < 0 {
            return Err(AppError::InvalidInput(format!(
                "maximum entries must be 0 or more, got {}",
                settings.max_elements
            )));
        }
        self.db.set_settings(&settings)?;
        *self.lock_settings()? = settings;
        enforce_retention(&self.db, settings.max_elements)?;
        info!(
            "settings updated: sounds={}, max_elements={}, number={}",
            settings.sounds_enabled, settings.max_elements, settings.announce_index_number
        );
        Ok(settings)
    }

    pub fn snapshot(&self) -> AppResult<Snapshot> {
        Ok(Snapshot {
            general: self.db.list_all(false)?,
            favorites: self.db.list_all(true)?,
        })
    }

    pub fn clear(&self, include_favorites: bool) -> AppResult<usize> {
        let deleted = self.db.delete_all(include_favorites)?;
        info!("cleared {deleted} history entries (favorites included: {include_favorites})");
        Ok(deleted)
    }

    pub fn close(&self) -> AppResult<()> {
        self.stop_monitoring()
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    fn lock_settings(&self) -> AppResult<MutexGuard<'_, Settings>> {
        self.settings
            .lock()
            .map_err(|_| AppError::Internal("settings lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::clipboard::testing::MemoryClipboard;
    use crate::clipboard::ClipboardError;
    use crate::listener::ManualWatcher;

    struct NoPaste;

    impl Paster for NoPaste {
        fn paste(&self) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unsupported)
        }
    }

    fn controller(
        db: Arc<Database>,
    ) -> (HistoryController, Arc<MemoryClipboard>, Arc<ManualWatcher>) {
        let clipboard = Arc::new(MemoryClipboard::default());
        let watcher = Arc::new(ManualWatcher::new());
        let controller =
            HistoryController::new(db, clipboard.clone(), Arc::new(NoPaste), watcher.clone())
                .expect("controller");
        (controller, clipboard, watcher)
    }

    #[test]
    fn startup_trims_history_to_stored_limit() {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        for text in ["a", "b", "c", "d"] {
            db.insert(text, false).expect("insert");
        }
        db.set_settings(&Settings {
            max_elements: 3,
            ..Settings::default()
        })
        .expect("settings");

        let (controller, _clipboard, _watcher) = controller(db.clone());
        assert_eq!(db.count().expect("count"), 3);
        assert_eq!(controller.settings().expect("settings").max_elements, 3);
    }

    #[test]
    fn monitoring_records_copies_until_stopped() {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        let (controller, clipboard, watcher) = controller(db.clone());

        controller.start_monitoring(true).expect("start");
        assert_eq!(controller.listener_state(), ListenerState::Running);

        clipboard.set_current(Some("copied"));
        watcher.notify();
        let deadline = Instant::now() + Duration::from_secs(5);
        while db.count().expect("count") == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        controller.close().expect("close");
        assert_eq!(controller.listener_state(), ListenerState::Idle);
        controller.close().expect("close twice");

        let session = controller.open_session().expect("session");
        assert_eq!(session.current().map(|entry| entry.text.as_str()), Some("copied"));
    }

    #[test]
    fn lowering_the_limit_prunes_immediately() {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        let (controller, _clipboard, _watcher) = controller(db.clone());
        for text in ["a", "b", "c"] {
            db.insert(text, false).expect("insert");
        }

        controller
            .update_settings(Settings {
                max_elements: 1,
                ..Settings::default()
            })
            .expect("update");
        let snapshot = controller.snapshot().expect("snapshot");
        assert_eq!(snapshot.general.len(), 1);
        assert_eq!(snapshot.general[0].text, "c");
    }

    #[test]
    fn negative_limit_is_rejected() {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        let (controller, _clipboard, _watcher) = controller(db);
        let result = controller.update_settings(Settings {
            max_elements: -1,
            ..Settings::default()
        });
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(controller.settings().expect("settings").max_elements, 100);
    }

    #[test]
    fn clear_keeps_favorites_unless_asked() {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        let (controller, _clipboard, _watcher) = controller(db.clone());
        db.insert("plain", false).expect("insert");
        db.insert("fav", true).expect("insert");

        assert_eq!(controller.clear(false).expect("clear"), 1);
        assert_eq!(controller.snapshot().expect("snapshot").favorites.len(), 1);
        assert_eq!(controller.clear(true).expect("clear all"), 1);
        assert_eq!(db.count().expect("count"), 0);
    }
}
