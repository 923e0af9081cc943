use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::clipboard::{ClipboardService, Paster};
use crate::db::{Database, HistoryEntry, Settings};
use crate::error::{AppError, AppResult};
use crate::utils::text::text_stats;

pub const HELP_TEXT: &str = "\
up / down      previous / next entry
home / end     first / last entry
right          copy the entry to the clipboard and close
left           show the full text of the entry
backspace      delete the entry (in favorites: remove it)
v              paste the entry into the focused window
tab            switch between the general and favorites lists
f              mark the entry as favorite
b <text>       search the list
f3             next search result
g <n>          go to entry number n
e              announce position and list size
c              count characters, spaces, words and lines
s              show settings (s sounds|max|number <value> to change)
z [all]        clear the history (all: favorites too)
f1             this help
escape         close the history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    General,
    Favorites,
}

impl ListKind {
    fn other(self) -> Self {
        match self {
            ListKind::General => ListKind::Favorites,
            ListKind::Favorites => ListKind::General,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::General => f.write_str("General"),
            ListKind::Favorites => f.write_str("Favorites"),
        }
    }
}

/// Audio cues. Hosts map these onto `<name>.wav` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Start,
    Close,
    Click,
    Stop,
    Copy,
    Paste,
    Open,
    Delete,
}

impl Sound {
    pub fn name(self) -> &'static str {
        match self {
            Sound::Start => "start",
            Sound::Close => "close",
            Sound::Click => "click",
            Sound::Stop => "stop",
            Sound::Copy => "copy",
            Sound::Paste => "paste",
            Sound::Open => "open",
            Sound::Delete => "delete",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.wav", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub sound: Option<Sound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Next,
    Previous,
    First,
    Last,
}

pub struct HistorySession {
    db: Arc<Database>,
    clipboard: Arc<dyn ClipboardService>,
    paster: Arc<dyn Paster>,
    settings: Settings,
    general: Vec<HistoryEntry>,
    favorites: Vec<HistoryEntry>,
    active: ListKind,
    cursor: usize,
    /// Cursor of the list that is not active.
    parked_cursor: usize,
    search_text: Option<String>,
    open: bool,
}

impl HistorySession {
    pub fn new(
        db: Arc<Database>,
        clipboard: Arc<dyn ClipboardService>,
        paster: Arc<dyn Paster>,
        settings: Settings,
    ) -> AppResult<Self> {
        let mut session = Self {
            db,
            clipboard,
            paster,
            settings,
            general: Vec::new(),
            favorites: Vec::new(),
            active: ListKind::General,
            cursor: 0,
            parked_cursor: 0,
            search_text: None,
            open: true,
        };
        session.reload()?;
        Ok(session)
    }

    pub fn greeting(&self) -> Feedback {
        self.feedback("History opened", Sound::Start)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn active_list(&self) -> ListKind {
        self.active
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self, kind: ListKind) -> &[HistoryEntry] {
        match kind {
            ListKind::General => &self.general,
            ListKind::Favorites => &self.favorites,
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries(self.active).get(self.cursor)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn reload(&mut self) -> AppResult<()> {
        self.general = self.db.list_all(false)?;
        self.favorites = self.db.list_all(true)?;
        self.cursor = self.cursor.min(self.len().saturating_sub(1));
        let parked_len = self.entries(self.active.other()).len();
        self.parked_cursor = self.parked_cursor.min(parked_len.saturating_sub(1));
        Ok(())
    }

    pub fn move_cursor(&mut self, movement: Movement) -> AppResult<Feedback> {
        self.guard()?;
        let last = self.len() - 1;
        self.cursor = match movement {
            Movement::Next => (self.cursor + 1).min(last),
            Movement::Previous => self.cursor.saturating_sub(1),
            Movement::First => 0,
            Movement::Last => last,
        };
        let sound = if self.cursor == 0 || self.cursor == last {
            Sound::Stop
        } else {
            Sound::Click
        };
        Ok(self.feedback(self.spoken_entry()?, sound))
    }

    pub fn copy(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        let text = self.current_text()?;
        self.clipboard.set_text(&text)?;
        Ok(self.finish("Item copied", Sound::Copy))
    }

    pub fn paste(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        let text = self.current_text()?;
        self.clipboard.set_text(&text)?;
        let feedback = self.finish("Pasted", Sound::Paste);
        self.paster.paste()?;
        Ok(feedback)
    }

    pub fn view(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        let text = self.current_text()?;
        Ok(self.feedback(text, Sound::Open))
    }

    pub fn delete(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        let text = self.current_text()?;
        self.db.delete_by_text(&text)?;

        if self.active == ListKind::Favorites {
            self.favorites.remove(self.cursor);
            return Ok(self.silent("Removed from favorites"));
        }

        self.favorites.retain(|entry| entry.text != text);
        self.general.remove(self.cursor);
        if self.general.is_empty() {
            return Ok(self.feedback("Empty list", Sound::Delete));
        }
        if self.cursor == self.general.len() {
            self.cursor -= 1;
        }
        Ok(self.feedback(self.spoken_entry()?, Sound::Delete))
    }

    pub fn favorite(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        if self.active != ListKind::General || self.general[self.cursor].favorite {
            return Ok(self.silent("Already a favorite"));
        }

        // The row may have been evicted since the snapshot was taken.
        if !self.db.update_favorite(&self.general[self.cursor].text, true)? {
            return Err(AppError::NotFound);
        }
        let mut entry = self.general.remove(self.cursor);
        entry.favorite = true;
        let position = self
            .favorites
            .iter()
            .position(|existing| existing.id < entry.id)
            .unwrap_or(self.favorites.len());
        self.favorites.insert(position, entry);
        Ok(self.silent("Marked as favorite"))
    }

    pub fn switch_list(&mut self) -> Feedback {
        std::mem::swap(&mut self.cursor, &mut self.parked_cursor);
        self.active = self.active.other();
        self.silent(self.active.to_string())
    }

    pub fn find(&mut self, query: &str) -> AppResult<Feedback> {
        self.guard()?;
        if query.is_empty() {
            return Ok(self.silent("Search cancelled"));
        }
        self.search_text = Some(query.to_string());
        self.search()
    }

    pub fn find_next(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        self.search()
    }

    pub fn jump_to(&mut self, input: &str) -> AppResult<Feedback> {
        self.guard()?;
        let input = input.trim();
        let target = input
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| input.parse::<usize>().ok())
            .flatten()
            .filter(|index| (1..=self.len()).contains(index));

        let Some(index) = target else {
            return Ok(self.silent("Invalid value or out of range"));
        };
        self.cursor = index - 1;
        let text = self.current_text()?;
        Ok(self.silent(format!("{index}; {text}")))
    }

    pub fn announce_index(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        let mut message = format!("{} of {}", self.cursor + 1, self.len());
        let is_favorite = self.current().is_some_and(|entry| entry.favorite);
        if self.active == ListKind::General && is_favorite {
            message.insert_str(0, "favorite- ");
        }
        Ok(self.silent(message))
    }

    pub fn count(&mut self) -> AppResult<Feedback> {
        self.guard()?;
        let stats = text_stats(&self.current_text()?);
        Ok(self.silent(format!(
            "{} characters, {} spaces, {} words, {} lines",
            stats.chars, stats.spaces, stats.words, stats.lines
        )))
    }

    pub fn help(&self) -> Feedback {
        self.silent(HELP_TEXT)
    }

    pub fn close(&mut self) -> Feedback {
        self.finish("History closed", Sound::Close)
    }

    fn search(&mut self) -> AppResult<Feedback> {
        let Some(query) = self.search_text.as_deref() else {
            return Ok(self.silent("No search text"));
        };
        let needle = query.to_lowercase();
        let list = self.entries(self.active);
        let found = (self.cursor + 1..list.len())
            .chain(0..=self.cursor)
            .find(|&i| list[i].text.to_lowercase().contains(&needle));

        match found {
            Some(index) => {
                self.cursor = index;
                let text = self.current_text()?;
                Ok(self.silent(format!("{}; {text}", index + 1)))
            }
            None => Ok(self.silent("No results")),
        }
    }

    fn guard(&mut self) -> AppResult<()> {
        let len = self.len();
        if len == 0 {
            return Err(AppError::EmptyList);
        }
        if self.cursor >= len {
            self.cursor = len - 1;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries(self.active).len()
    }

    fn current_text(&self) -> AppResult<String> {
        self.current()
            .map(|entry| entry.text.clone())
            .ok_or(AppError::EmptyList)
    }

    fn spoken_entry(&self) -> AppResult<String> {
        let text = self.current_text()?;
        if self.settings.announce_index_number {
            Ok(format!("{}; {text}", self.cursor + 1))
        } else {
            Ok(text)
        }
    }

    fn finish(&mut self, message: impl Into<String>, sound: Sound) -> Feedback {
        self.open = false;
        self.feedback(message, sound)
    }

    fn feedback(&self, message: impl Into<String>, sound: Sound) -> Feedback {
        Feedback {
            message: message.into(),
            sound: self.settings.sounds_enabled.then_some(sound),
        }
    }

    fn silent(&self, message: impl Into<String>) -> Feedback {
        Feedback {
            message: message.into(),
            sound: None,
        }
    }
}
