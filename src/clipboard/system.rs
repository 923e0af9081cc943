use arboard::Clipboard;

use super::{ClipboardError, ClipboardService};

#[derive(Debug, Clone, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<Clipboard, ClipboardError> {
        Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))
    }
}

impl ClipboardService for SystemClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        match Self::open()?.get_text() {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => Err(ClipboardError::Unavailable(err.to_string())),
        }
    }

    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        Self::open()?
            .set_text(text)
            .map_err(|err| ClipboardError::Unavailable(err.to_string()))
    }
}
