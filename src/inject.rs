//! Key injection backends
//!
//! The engine only produces [`InjectionPlan`](crate::engine::InjectionPlan)s;
//! a [`KeyInjector`] turns the ordered press/release events into OS input.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::engine::{Key, KeyEvent};

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("failed to simulate {event:?}: {reason}")]
    Simulate { event: KeyEvent, reason: String },
}

/// Delivers key events in the given order
pub trait KeyInjector: Send + Sync {
    fn inject(&self, events: &[KeyEvent]) -> Result<(), InjectError>;

    fn name(&self) -> &'static str;
}

/// Injection backend selected in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionBackend {
    /// Log key events only
    #[default]
    Log,
    /// Synthesize real key strokes (Windows)
    SendInput,
}

impl fmt::Display for InjectionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionBackend::Log => write!(f, "log"),
            InjectionBackend::SendInput => write!(f, "send_input"),
        }
    }
}

/// Build the injector for `backend`, falling back to logging where the
/// backend is unsupported
pub fn injector_for(backend: InjectionBackend) -> Arc<dyn KeyInjector> {
    match backend {
        InjectionBackend::Log => Arc::new(LogInjector),
        #[cfg(windows)]
        InjectionBackend::SendInput => Arc::new(send_input::SendInputInjector),
        #[cfg(not(windows))]
        InjectionBackend::SendInput => {
            tracing::warn!("send_input injection is only available on Windows, key events will only be logged");
            Arc::new(LogInjector)
        }
    }
}

/// Logs every key event instead of touching the OS
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInjector;

impl KeyInjector for LogInjector {
    fn inject(&self, events: &[KeyEvent]) -> Result<(), InjectError> {
        for event in events {
            match event {
                KeyEvent::Press(key) => info!("⌨️  press {:?}", key),
                KeyEvent::Release(key) => info!("⌨️  release {:?}", key),
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Collects injected events, for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingInjector {
    events: Arc<Mutex<Vec<KeyEvent>>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event injected so far, in order
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().clone()
    }

    /// Keys pressed so far
    pub fn presses(&self) -> Vec<Key> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                KeyEvent::Press(key) => Some(*key),
                KeyEvent::Release(_) => None,
            })
            .collect()
    }
}

impl KeyInjector for RecordingInjector {
    fn inject(&self, events: &[KeyEvent]) -> Result<(), InjectError> {
        self.events.lock().extend_from_slice(events);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(windows)]
mod send_input {
    use std::mem::size_of;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
        KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VIRTUAL_KEY, VK_DOWN, VK_LEFT, VK_NEXT, VK_PRIOR,
        VK_RIGHT, VK_SHIFT, VK_SPACE, VK_UP,
    };

    use super::{InjectError, KeyInjector};
    use crate::engine::{Key, KeyEvent};

    /// Synthesizes key strokes with Win32 `SendInput`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SendInputInjector;

    fn virtual_key(key: Key) -> (VIRTUAL_KEY, bool) {
        // (key, extended)
        match key {
            Key::Right => (VK_RIGHT, true),
            Key::Left => (VK_LEFT, true),
            Key::Up => (VK_UP, true),
            Key::Down => (VK_DOWN, true),
            Key::PageUp => (VK_PRIOR, true),
            Key::PageDown => (VK_NEXT, true),
            Key::Space => (VK_SPACE, false),
            Key::Shift => (VK_SHIFT, false),
        }
    }

    fn keyboard_input(event: KeyEvent) -> INPUT {
        let (vk, extended) = virtual_key(event.key());
        let mut flags = KEYBD_EVENT_FLAGS(0);
        if extended {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if matches!(event, KeyEvent::Release(_)) {
            flags |= KEYEVENTF_KEYUP;
        }

        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    impl KeyInjector for SendInputInjector {
        fn inject(&self, events: &[KeyEvent]) -> Result<(), InjectError> {
            let inputs: Vec<INPUT> = events.iter().copied().map(keyboard_input).collect();

            // One call keeps the sequence from interleaving with real typing
            let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };

            if sent as usize != inputs.len() {
                return Err(InjectError::Simulate {
                    event: events[sent as usize],
                    reason: format!("SendInput accepted {} of {} events", sent, inputs.len()),
                });
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "send_input"
        }
    }
}
