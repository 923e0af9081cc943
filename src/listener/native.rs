use std::sync::{Arc, Mutex};

use clipboard_rs::{
    ClipboardHandler, ClipboardWatcher as _, ClipboardWatcherContext, WatcherShutdown,
};
use tracing::debug;

use super::{ClipboardWatcher, ListenerError, WatchContext};

struct UpdateForwarder {
    ctx: Arc<WatchContext>,
}

impl ClipboardHandler for UpdateForwarder {
    fn on_clipboard_change(&mut self) {
        self.ctx.clipboard_updated();
    }
}

#[derive(Default)]
pub struct NativeWatcher {
    shutdown: Mutex<Option<WatcherShutdown>>,
}

impl NativeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_shutdown(&self) -> Option<WatcherShutdown> {
        self.shutdown.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ClipboardWatcher for NativeWatcher {
    fn watch(&self, ctx: Arc<WatchContext>) -> Result<(), ListenerError> {
        let mut watcher = ClipboardWatcherContext::new()
            .map_err(|err| ListenerError::Native(err.to_string()))?;
        let shutdown = watcher
            .add_handler(UpdateForwarder {
                ctx: Arc::clone(&ctx),
            })
            .get_shutdown_channel();
        *self.shutdown.lock().map_err(|_| ListenerError::LockPoisoned)? = Some(shutdown);

        // A wake that arrived before the channel was stored found nothing to stop.
        if ctx.should_stop() {
            self.take_shutdown();
            return Ok(());
        }

        ctx.started();
        watcher.start_watch();
        debug!("clipboard-rs watch loop returned");
        self.take_shutdown();
        Ok(())
    }

    fn wake(&self) {
        if let Some(shutdown) = self.take_shutdown() {
            shutdown.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_without_watch_is_noop() {
        let watcher = NativeWatcher::new();
        watcher.wake();
        assert!(watcher.take_shutdown().is_none());
    }
}
