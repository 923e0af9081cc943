use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{error, info, warn};

mod manual;
#[cfg(not(windows))]
mod native;
#[cfg(windows)]
mod windows;

pub use manual::ManualWatcher;
#[cfg(not(windows))]
pub use native::NativeWatcher;
#[cfg(windows)]
pub use windows::Win32Watcher;

const THREAD_NAME: &str = "clipboard-listener";

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to register listener window class (os error {0})")]
    RegisterClass(u32),
    #[error("failed to create listener window (os error {0})")]
    CreateWindow(u32),
    #[error("failed to subscribe to clipboard updates (os error {0})")]
    Subscribe(u32),
    #[error("message retrieval failed (os error {0})")]
    MessageLoop(u32),
    #[error("failed to open clipboard watcher: {0}")]
    Native(String),
    #[error("clipboard listener is already running")]
    AlreadyStarted,
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("listener thread panicked")]
    Panicked,
    #[error("listener lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

pub trait WatchHandler: Send + Sync {
    fn on_update(&self);
}

pub trait ClipboardWatcher: Send + Sync {
    fn watch(&self, ctx: Arc<WatchContext>) -> Result<(), ListenerError>;

    fn wake(&self);
}

pub fn default_watcher() -> Arc<dyn ClipboardWatcher> {
    #[cfg(windows)]
    {
        Arc::new(Win32Watcher::new())
    }
    #[cfg(not(windows))]
    {
        Arc::new(NativeWatcher::new())
    }
}

#[derive(Debug)]
struct SharedState {
    state: Mutex<ListenerState>,
    changed: Condvar,
}

impl SharedState {
    fn lock(&self) -> Result<MutexGuard<'_, ListenerState>, ListenerError> {
        self.state.lock().map_err(|_| ListenerError::LockPoisoned)
    }

    fn set(&self, next: ListenerState) -> Result<(), ListenerError> {
        *self.lock()? = next;
        self.changed.notify_all();
        Ok(())
    }
}

pub struct WatchContext {
    shared: Arc<SharedState>,
    handler: Arc<dyn WatchHandler>,
    ready: Mutex<Option<Sender<Result<(), ListenerError>>>>,
}

impl WatchContext {
    fn new(
        shared: Arc<SharedState>,
        handler: Arc<dyn WatchHandler>,
        ready: Option<Sender<Result<(), ListenerError>>>,
    ) -> Self {
        Self {
            shared,
            handler,
            ready: Mutex::new(ready),
        }
    }

    pub fn started(&self) {
        if let Ok(mut state) = self.shared.lock() {
            if *state == ListenerState::Starting {
                *state = ListenerState::Running;
                self.shared.changed.notify_all();
            }
        }
        if let Some(ready) = self.take_ready() {
            let _ = ready.send(Ok(()));
        }
    }

    pub fn should_stop(&self) -> bool {
        self.shared
            .lock()
            .map(|state| *state == ListenerState::Stopping)
            .unwrap_or(true)
    }

    pub fn clipboard_updated(&self) {
        self.handler.on_update();
    }

    fn take_ready(&self) -> Option<Sender<Result<(), ListenerError>>> {
        self.ready.lock().ok().and_then(|mut ready| ready.take())
    }

    // Hands back the startup channel if the watcher never reported ready.
    fn finish(&self) -> Option<Sender<Result<(), ListenerError>>> {
        let _ = self.shared.set(ListenerState::Idle);
        self.take_ready()
    }
}

pub struct ClipboardListener {
    watcher: Arc<dyn ClipboardWatcher>,
    handler: Arc<dyn WatchHandler>,
    shared: Arc<SharedState>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardListener {
    pub fn new(watcher: Arc<dyn ClipboardWatcher>, handler: Arc<dyn WatchHandler>) -> Self {
        Self {
            watcher,
            handler,
            shared: Arc::new(SharedState {
                state: Mutex::new(ListenerState::Idle),
                changed: Condvar::new(),
            }),
            thread: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.shared
            .lock()
            .map(|state| *state)
            .unwrap_or(ListenerState::Idle)
    }

    pub fn start_monitoring(&self, as_thread: bool) -> Result<(), ListenerError> {
        {
            let mut state = self.shared.lock()?;
            if *state != ListenerState::Idle {
                return Err(ListenerError::AlreadyStarted);
            }
            *state = ListenerState::Starting;
        }
        self.reap_finished_thread();

        if !as_thread {
            info!("clipboard listener running on caller thread");
            let ctx = Arc::new(WatchContext::new(
                Arc::clone(&self.shared),
                Arc::clone(&self.handler),
                None,
            ));
            let result = self.watcher.watch(Arc::clone(&ctx));
            ctx.finish();
            return result;
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let ctx = Arc::new(WatchContext::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.handler),
            Some(ready_tx),
        ));
        let watcher = Arc::clone(&self.watcher);

        let mut slot = self.thread.lock().map_err(|_| ListenerError::LockPoisoned)?;
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let result = watcher.watch(Arc::clone(&ctx));
                match (ctx.finish(), result) {
                    (Some(ready), result) => {
                        let _ = ready.send(result);
                    }
                    (None, Err(err)) => error!("clipboard listener stopped: {err}"),
                    (None, Ok(())) => info!("clipboard listener stopped"),
                }
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                drop(slot);
                self.shared.set(ListenerState::Idle)?;
                return Err(ListenerError::Spawn(err));
            }
        };
        *slot = Some(handle);
        drop(slot);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("clipboard listener started");
                Ok(())
            }
            Ok(Err(err)) => {
                self.reap_finished_thread();
                Err(err)
            }
            Err(_) => {
                self.reap_finished_thread();
                self.shared.set(ListenerState::Idle)?;
                Err(ListenerError::Panicked)
            }
        }
    }

    /// Wakes the watcher and waits, without a timeout, until it has torn
    /// down and the listener is `Idle` again. Must not be called from the
    /// update handler.
    pub fn stop_monitoring(&self) -> Result<(), ListenerError> {
        let handle = {
            let mut state = self.shared.lock()?;
            if *state == ListenerState::Idle {
                return Ok(());
            }
            *state = ListenerState::Stopping;
            self.watcher.wake();
            self.thread
                .lock()
                .map_err(|_| ListenerError::LockPoisoned)?
                .take()
        };

        let Some(handle) = handle else {
            // Caller-thread mode: the watch loop ends on another thread.
            let state = self.shared.lock()?;
            let _idle = self
                .shared
                .changed
                .wait_while(state, |state| *state == ListenerState::Stopping)
                .map_err(|_| ListenerError::LockPoisoned)?;
            return Ok(());
        };
        let joined = handle.join();
        {
            let mut state = self.shared.lock()?;
            if *state == ListenerState::Stopping {
                *state = ListenerState::Idle;
                self.shared.changed.notify_all();
            }
        }
        joined.map_err(|_| ListenerError::Panicked)
    }

    fn reap_finished_thread(&self) {
        let handle = match self.thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("previous clipboard listener thread panicked");
            }
        }
    }
}

impl Drop for ClipboardListener {
    fn drop(&mut self) {
        if let Err(err) = self.stop_monitoring() {
            warn!("failed to stop clipboard listener: {err}");
        }
    }
}
