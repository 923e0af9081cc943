use std::sync::Arc;

use super::ClipboardError;

pub trait Paster: Send + Sync {
    fn paste(&self) -> Result<(), ClipboardError>;
}

pub fn default_paster() -> Arc<dyn Paster> {
    #[cfg(windows)]
    {
        Arc::new(windows::KeyboardPaster)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedPaster)
    }
}

#[cfg(not(windows))]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPaster;

#[cfg(not(windows))]
impl Paster for UnsupportedPaster {
    fn paste(&self) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unsupported)
    }
}

#[cfg(windows)]
mod windows {
    use winapi::um::winuser::{keybd_event, KEYEVENTF_KEYUP, VK_CONTROL};

    use super::{ClipboardError, Paster};

    const VK_V: u8 = 0x56;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct KeyboardPaster;

    impl Paster for KeyboardPaster {
        fn paste(&self) -> Result<(), ClipboardError> {
            let control = VK_CONTROL as u8;
            // SAFETY: keybd_event only queues synthetic input; no pointers involved.
            unsafe {
                keybd_event(control, 0, 0, 0);
                keybd_event(VK_V, 0, 0, 0);
                keybd_event(VK_V, 0, KEYEVENTF_KEYUP, 0);
                keybd_event(control, 0, KEYEVENTF_KEYUP, 0);
            }
            Ok(())
        }
    }
}
