use std::cell::{Cell, RefCell};
use std::iter;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, error};
use winapi::shared::minwindef::{HINSTANCE, LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::HWND;
use winapi::shared::winerror::ERROR_CLASS_ALREADY_EXISTS;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::processthreadsapi::GetCurrentThreadId;
use winapi::um::winuser::{
    AddClipboardFormatListener, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetClassInfoExW, GetMessageW, PostThreadMessageW, RegisterClassExW,
    RemoveClipboardFormatListener, TranslateMessage, UnregisterClassW, HWND_MESSAGE, MSG,
    WM_CLIPBOARDUPDATE, WM_QUIT, WNDCLASSEXW,
};

use super::{ClipboardWatcher, ListenerError, WatchContext};

static CLASS_NAME: Lazy<Vec<u16>> = Lazy::new(|| wide("ClipkeepClipboardListener"));
static WINDOW_TITLE: Lazy<Vec<u16>> = Lazy::new(|| wide("Clipkeep Clipboard Monitor"));

thread_local! {
    static ACTIVE_CONTEXT: RefCell<Option<Arc<WatchContext>>> = const { RefCell::new(None) };
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(iter::once(0)).collect()
}

fn last_error() -> u32 {
    // SAFETY: reads the calling thread's last-error slot.
    unsafe { GetLastError() }
}

#[derive(Debug, Default)]
pub struct Win32Watcher {
    /// Id of the thread currently inside `watch`, 0 when none.
    thread_id: AtomicU32,
}

impl Win32Watcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWatcher for Win32Watcher {
    fn watch(&self, ctx: Arc<WatchContext>) -> Result<(), ListenerError> {
        // SAFETY: no preconditions.
        let thread_id = unsafe { GetCurrentThreadId() };
        self.thread_id.store(thread_id, Ordering::SeqCst);
        let result = run_message_loop(ctx);
        self.thread_id.store(0, Ordering::SeqCst);
        result
    }

    fn wake(&self) {
        let thread_id = self.thread_id.load(Ordering::SeqCst);
        if thread_id == 0 {
            return;
        }
        // SAFETY: posting to a thread id has no memory-safety preconditions.
        // Failure means the queue is gone or not created yet; the loop's
        // `should_stop` check covers both.
        let posted = unsafe { PostThreadMessageW(thread_id, WM_QUIT, 0, 0) };
        if posted == 0 {
            debug!("PostThreadMessageW failed (os error {})", last_error());
        }
    }
}

fn run_message_loop(ctx: Arc<WatchContext>) -> Result<(), ListenerError> {
    let window = MessageWindow::create()?;
    window.subscribe()?;
    let _active = ActiveContext::install(Arc::clone(&ctx));
    ctx.started();

    // SAFETY: MSG is plain data; all-zero is a valid value.
    let mut msg: MSG = unsafe { mem::zeroed() };
    while !ctx.should_stop() {
        // SAFETY: `msg` is a valid out-pointer for the duration of the call.
        let status = unsafe { GetMessageW(&mut msg, ptr::null_mut(), 0, 0) };
        match status {
            0 => break,
            -1 => return Err(ListenerError::MessageLoop(last_error())),
            _ => {
                // SAFETY: `msg` was filled in by GetMessageW.
                unsafe {
                    TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
        }
    }
    Ok(())
}

struct ActiveContext;

impl ActiveContext {
    fn install(ctx: Arc<WatchContext>) -> Self {
        ACTIVE_CONTEXT.with(|active| *active.borrow_mut() = Some(ctx));
        Self
    }
}

impl Drop for ActiveContext {
    fn drop(&mut self) {
        ACTIVE_CONTEXT.with(|active| active.borrow_mut().take());
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: UINT,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg != WM_CLIPBOARDUPDATE {
        return DefWindowProcW(hwnd, msg, wparam, lparam);
    }

    let ctx = ACTIVE_CONTEXT.with(|active| active.borrow().clone());
    if let Some(ctx) = ctx {
        // Unwinding across the FFI boundary would abort the host.
        if panic::catch_unwind(AssertUnwindSafe(|| ctx.clipboard_updated())).is_err() {
            error!("clipboard update handler panicked");
        }
    }
    0
}

struct MessageWindow {
    hwnd: HWND,
    instance: HINSTANCE,
    subscribed: Cell<bool>,
}

impl MessageWindow {
    fn create() -> Result<Self, ListenerError> {
        // SAFETY: a null module name yields the handle of the current executable.
        let instance = unsafe { GetModuleHandleW(ptr::null()) };
        register_class(instance)?;

        // SAFETY: class and title are NUL-terminated and outlive the call.
        let hwnd = unsafe {
            CreateWindowExW(
                0,
                CLASS_NAME.as_ptr(),
                WINDOW_TITLE.as_ptr(),
                0,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                ptr::null_mut(),
                instance,
                ptr::null_mut(),
            )
        };
        if hwnd.is_null() {
            let code = last_error();
            unregister_class(instance);
            return Err(ListenerError::CreateWindow(code));
        }

        Ok(Self {
            hwnd,
            instance,
            subscribed: Cell::new(false),
        })
    }

    fn subscribe(&self) -> Result<(), ListenerError> {
        // SAFETY: `hwnd` is a live window owned by this thread.
        if unsafe { AddClipboardFormatListener(self.hwnd) } == 0 {
            return Err(ListenerError::Subscribe(last_error()));
        }
        self.subscribed.set(true);
        Ok(())
    }
}

impl Drop for MessageWindow {
    fn drop(&mut self) {
        // SAFETY: `hwnd` was created on this thread and is destroyed once.
        unsafe {
            if self.subscribed.get() {
                RemoveClipboardFormatListener(self.hwnd);
            }
            DestroyWindow(self.hwnd);
        }
        unregister_class(self.instance);
    }
}

fn register_class(instance: HINSTANCE) -> Result<(), ListenerError> {
    // SAFETY: WNDCLASSEXW is plain data; cbSize is set before use.
    let mut existing: WNDCLASSEXW = unsafe { mem::zeroed() };
    existing.cbSize = mem::size_of::<WNDCLASSEXW>() as UINT;
    // SAFETY: `existing` is a valid out-pointer and the class name is NUL-terminated.
    if unsafe { GetClassInfoExW(instance, CLASS_NAME.as_ptr(), &mut existing) } != 0 {
        return Ok(());
    }

    let class = WNDCLASSEXW {
        cbSize: mem::size_of::<WNDCLASSEXW>() as UINT,
        style: 0,
        lpfnWndProc: Some(window_proc),
        cbClsExtra: 0,
        cbWndExtra: 0,
        hInstance: instance,
        hIcon: ptr::null_mut(),
        hCursor: ptr::null_mut(),
        hbrBackground: ptr::null_mut(),
        lpszMenuName: ptr::null(),
        lpszClassName: CLASS_NAME.as_ptr(),
        hIconSm: ptr::null_mut(),
    };
    // SAFETY: `class` is fully initialised and its strings are 'static.
    if unsafe { RegisterClassExW(&class) } != 0 {
        return Ok(());
    }
    match last_error() {
        ERROR_CLASS_ALREADY_EXISTS => Ok(()),
        code => Err(ListenerError::RegisterClass(code)),
    }
}

fn unregister_class(instance: HINSTANCE) {
    // SAFETY: the class name is NUL-terminated. Fails harmlessly while another
    // window still uses the class.
    if unsafe { UnregisterClassW(CLASS_NAME.as_ptr(), instance) } == 0 {
        debug!("listener class kept registered (os error {})", last_error());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::listener::{ClipboardListener, ListenerState, WatchHandler};

    // The window class is process-wide; these tests must not overlap.
    static CLASS_GUARD: Mutex<()> = Mutex::new(());

    struct IgnoreUpdates;

    impl WatchHandler for IgnoreUpdates {
        fn on_update(&self) {}
    }

    fn module_instance() -> HINSTANCE {
        // SAFETY: a null module name yields the handle of the current executable.
        unsafe { GetModuleHandleW(ptr::null()) }
    }

    fn class_registered(instance: HINSTANCE) -> bool {
        // SAFETY: WNDCLASSEXW is plain data; cbSize is set before use.
        let mut info: WNDCLASSEXW = unsafe { mem::zeroed() };
        info.cbSize = mem::size_of::<WNDCLASSEXW>() as UINT;
        // SAFETY: `info` is a valid out-pointer and the class name is NUL-terminated.
        unsafe { GetClassInfoExW(instance, CLASS_NAME.as_ptr(), &mut info) != 0 }
    }

    #[test]
    fn registering_twice_reuses_the_class() {
        let _guard = CLASS_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let instance = module_instance();

        register_class(instance).expect("first registration");
        register_class(instance).expect("second registration");
        assert!(class_registered(instance));

        unregister_class(instance);
        assert!(!class_registered(instance));
    }

    #[test]
    fn restart_cycle_releases_window_and_class() {
        let _guard = CLASS_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let instance = module_instance();
        let listener = ClipboardListener::new(Arc::new(Win32Watcher::new()), Arc::new(IgnoreUpdates));

        listener.stop_monitoring().expect("stop before start");
        for _ in 0..2 {
            listener.start_monitoring(true).expect("start");
            assert_eq!(listener.state(), ListenerState::Running);
            assert!(class_registered(instance));

            listener.stop_monitoring().expect("stop");
            assert_eq!(listener.state(), ListenerState::Idle);
            assert!(!class_registered(instance));
        }
    }
}
