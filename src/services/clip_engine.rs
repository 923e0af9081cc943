use std::sync::Arc;

use tracing::{debug, error};

use crate::clipboard::ClipboardService;
use crate::db::{Database, HistoryEntry};
use crate::error::AppResult;
use crate::listener::WatchHandler;
use crate::services::prune::enforce_retention;

pub struct ClipEngine {
    db: Arc<Database>,
    clipboard: Arc<dyn ClipboardService>,
}

impl ClipEngine {
    pub fn new(db: Arc<Database>, clipboard: Arc<dyn ClipboardService>) -> Self {
        Self { db, clipboard }
    }

    pub fn process_update(&self) -> AppResult<Option<HistoryEntry>> {
        let text = match self.clipboard.read_text() {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("clipboard update without text ignored");
                return Ok(None);
            }
            Err(err) => {
                debug!("clipboard update ignored: {err}");
                return Ok(None);
            }
        };
        self.process_text(&text)
    }

    pub fn process_text(&self, text: &str) -> AppResult<Option<HistoryEntry>> {
        if should_skip_text(text) {
            return Ok(None);
        }

        let entry = self.db.record_clip(text)?;
        let settings = self.db.get_settings()?;
        enforce_retention(&self.db, settings.max_elements)?;
        Ok(Some(entry))
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}

impl WatchHandler for ClipEngine {
    fn on_update(&self) {
        if let Err(err) = self.process_update() {
            error!("clipboard ingestion failed: {err}");
        }
    }
}

pub fn should_skip_text(text: &str) -> bool {
    text.is_empty()
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::clipboard::testing::MemoryClipboard;
    use crate::db::Settings;
    use crate::listener::{ClipboardListener, ManualWatcher};

    fn engine() -> (ClipEngine, Arc<Database>, Arc<MemoryClipboard>) {
        let db = Arc::new(Database::new_in_memory().expect("db"));
        let clipboard = Arc::new(MemoryClipboard::default());
        let engine = ClipEngine::new(db.clone(), clipboard.clone());
        (engine, db, clipboard)
    }

    fn copy(engine: &ClipEngine, clipboard: &MemoryClipboard, text: &str) {
        clipboard.set_current(Some(text));
        engine.process_update().expect("process");
    }

    #[test]
    fn repeated_copy_keeps_favorite_and_moves_to_top() {
        let (engine, db, clipboard) = engine();
        copy(&engine, &clipboard, "hello");
        copy(&engine, &clipboard, "world");
        db.update_favorite("hello", true).expect("favorite");
        copy(&engine, &clipboard, "hello");

        let favorites = db.list_all(true).expect("favorites");
        let general = db.list_all(false).expect("general");
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].text, "hello");
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].text, "world");
        assert!(favorites[0].id > general[0].id);
    }

    #[test]
    fn retention_drops_oldest() {
        let (engine, db, clipboard) = engine();
        db.set_settings(&Settings {
            max_elements: 2,
            ..Settings::default()
        })
        .expect("settings");

        for text in ["a", "b", "c"] {
            copy(&engine, &clipboard, text);
        }

        let texts: Vec<_> = db
            .list_all(false)
            .expect("list")
            .into_iter()
            .map(|entry| entry.text)
            .collect();
        assert_eq!(texts, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_or_unreadable_clipboard_is_ignored() {
        let (engine, db, clipboard) = engine();
        copy(&engine, &clipboard, "keep");

        clipboard.set_current(None);
        assert!(engine.process_update().expect("no text").is_none());
        clipboard.set_current(Some(""));
        assert!(engine.process_update().expect("empty").is_none());
        clipboard.set_current(Some("other"));
        clipboard.fail_reads(true);
        assert!(engine.process_update().expect("unreadable").is_none());

        assert_eq!(db.count().expect("count"), 1);
    }

    #[test]
    fn whitespace_is_recorded() {
        let (engine, db, clipboard) = engine();
        copy(&engine, &clipboard, "  ");
        assert_eq!(db.count().expect("count"), 1);
    }

    #[test]
    fn listener_thread_feeds_the_store() {
        let (engine, db, clipboard) = engine();
        let watcher = Arc::new(ManualWatcher::new());
        let listener = ClipboardListener::new(watcher.clone(), Arc::new(engine));

        listener.start_monitoring(true).expect("start");
        clipboard.set_current(Some("from another app"));
        watcher.notify();

        let deadline = Instant::now() + Duration::from_secs(5);
        while db.count().expect("count") == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        listener.stop_monitoring().expect("stop");

        let entry = db
            .find_by_text("from another app")
            .expect("lookup")
            .expect("recorded");
        assert!(!entry.favorite);
    }

    #[test]
    fn every_notification_is_recorded_even_for_identical_text() {
        let (engine, db, clipboard) = engine();
        let watcher = Arc::new(ManualWatcher::new());
        let engine = Arc::new(engine);
        let listener = ClipboardListener::new(watcher.clone(), engine);
        listener.start_monitoring(true).expect("start");

        for text in ["first", "second", "first"] {
            let newest_before = db.list_all(false).expect("list").first().map(|e| e.id);
            clipboard.set_current(Some(text));
            watcher.notify();

            let deadline = Instant::now() + Duration::from_secs(5);
            while db.list_all(false).expect("list").first().map(|e| e.id) == newest_before
                && Instant::now() < deadline
            {
                thread::sleep(Duration::from_millis(5));
            }
        }
        listener.stop_monitoring().expect("stop");

        let texts: Vec<_> = db
            .list_all(false)
            .expect("list")
            .into_iter()
            .map(|entry| entry.text)
            .collect();
        assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
    }
}
