use std::sync::{Arc, Condvar, Mutex};

use super::{ClipboardWatcher, ListenerError, WatchContext};

#[derive(Debug, Default)]
struct Inbox {
    pending: usize,
    woken: bool,
    watching: bool,
}

#[derive(Debug, Default)]
pub struct ManualWatcher {
    inbox: Mutex<Inbox>,
    signal: Condvar,
}

impl ManualWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        if let Ok(mut inbox) = self.inbox.lock() {
            if inbox.watching {
                inbox.pending += 1;
                self.signal.notify_all();
            }
        }
    }

    pub fn is_watching(&self) -> bool {
        self.inbox
            .lock()
            .map(|inbox| inbox.watching)
            .unwrap_or(false)
    }

    fn next_batch(&self) -> Result<Option<usize>, ListenerError> {
        let mut inbox = self.inbox.lock().map_err(|_| ListenerError::LockPoisoned)?;
        while !inbox.woken && inbox.pending == 0 {
            inbox = self
                .signal
                .wait(inbox)
                .map_err(|_| ListenerError::LockPoisoned)?;
        }
        if inbox.woken {
            inbox.woken = false;
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut inbox.pending)))
    }

    fn set_watching(&self, watching: bool) -> Result<(), ListenerError> {
        let mut inbox = self.inbox.lock().map_err(|_| ListenerError::LockPoisoned)?;
        *inbox = Inbox {
            watching,
            ..Inbox::default()
        };
        Ok(())
    }
}

impl ClipboardWatcher for ManualWatcher {
    fn watch(&self, ctx: Arc<WatchContext>) -> Result<(), ListenerError> {
        self.set_watching(true)?;
        ctx.started();

        let result = loop {
            // Checked outside the inbox lock: `wake` is called while the
            // listener holds its state lock.
            if ctx.should_stop() {
                break Ok(());
            }
            match self.next_batch() {
                Ok(Some(pending)) => {
                    for _ in 0..pending {
                        ctx.clipboard_updated();
                    }
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        self.set_watching(false)?;
        result
    }

    fn wake(&self) {
        if let Ok(mut inbox) = self.inbox.lock() {
            if inbox.watching {
                inbox.woken = true;
                self.signal.notify_all();
            }
        }
    }
}
