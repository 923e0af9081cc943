use std::sync::Arc;

use thiserror::Error;

pub mod paste;
pub mod system;

pub use paste::{default_paster, Paster};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("paste simulation is not supported on this platform")]
    Unsupported,
}

pub trait ClipboardService: Send + Sync {
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

pub fn default_service() -> Arc<dyn ClipboardService> {
    Arc::new(system::SystemClipboard::new())
}
