//! Hot-key polling
//!
//! The controller polls a [`KeyboardSource`] once per frame and acts on the
//! down edge only: holding the key across frames counts as one press. The
//! source is opened through a [`KeyboardConnector`] on the window connection
//! of the application's first surface.

use std::fmt;
use std::str::FromStr;

use crate::objects::WindowConnection;

/// Keys that can toggle recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum HotKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Tab,
    PrintScreen,
    ScrollLock,
    Pause,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
}

impl HotKey {
    /// Every supported key
    pub const ALL: [Self; 21] = [
        Self::F1,
        Self::F2,
        Self::F3,
        Self::F4,
        Self::F5,
        Self::F6,
        Self::F7,
        Self::F8,
        Self::F9,
        Self::F10,
        Self::F11,
        Self::F12,
        Self::Tab,
        Self::PrintScreen,
        Self::ScrollLock,
        Self::Pause,
        Self::Insert,
        Self::Home,
        Self::End,
        Self::PageUp,
        Self::PageDown,
    ];

    /// Name used in trigger strings
    pub const fn name(self) -> &'static str {
        match self {
            Self::F1 => "F1",
            Self::F2 => "F2",
            Self::F3 => "F3",
            Self::F4 => "F4",
            Self::F5 => "F5",
            Self::F6 => "F6",
            Self::F7 => "F7",
            Self::F8 => "F8",
            Self::F9 => "F9",
            Self::F10 => "F10",
            Self::F11 => "F11",
            Self::F12 => "F12",
            Self::Tab => "Tab",
            Self::PrintScreen => "PrintScreen",
            Self::ScrollLock => "ScrollLock",
            Self::Pause => "Pause",
            Self::Insert => "Insert",
            Self::Home => "Home",
            Self::End => "End",
            Self::PageUp => "PageUp",
            Self::PageDown => "PageDown",
        }
    }
}

impl fmt::Display for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that matches no [`HotKey`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown hot key: {0}")]
pub struct UnknownHotKey(pub String);

impl FromStr for HotKey {
    type Err = UnknownHotKey;

    /// Key names are matched case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownHotKey(name.to_string()))
    }
}

/// Anything that can report whether a key is held down
pub trait KeyboardSource {
    /// Whether `key` is currently down
    fn is_key_down(&self, key: HotKey) -> bool;
}

impl<F> KeyboardSource for F
where
    F: Fn(HotKey) -> bool,
{
    fn is_key_down(&self, key: HotKey) -> bool {
        self(key)
    }
}

/// Opens a keyboard on the application's window connection
pub trait KeyboardConnector {
    /// Keyboard reachable through `connection`, if any
    fn connect(&self, connection: WindowConnection) -> Option<Box<dyn KeyboardSource + Send>>;
}

impl<F> KeyboardConnector for F
where
    F: Fn(WindowConnection) -> Option<Box<dyn KeyboardSource + Send>>,
{
    fn connect(&self, connection: WindowConnection) -> Option<Box<dyn KeyboardSource + Send>> {
        self(connection)
    }
}

#[cfg(feature = "glfw")]
impl HotKey {
    /// Matching GLFW key
    pub const fn to_glfw(self) -> glfw::Key {
        match self {
            Self::F1 => glfw::Key::F1,
            Self::F2 => glfw::Key::F2,
            Self::F3 => glfw::Key::F3,
            Self::F4 => glfw::Key::F4,
            Self::F5 => glfw::Key::F5,
            Self::F6 => glfw::Key::F6,
            Self::F7 => glfw::Key::F7,
            Self::F8 => glfw::Key::F8,
            Self::F9 => glfw::Key::F9,
            Self::F10 => glfw::Key::F10,
            Self::F11 => glfw::Key::F11,
            Self::F12 => glfw::Key::F12,
            Self::Tab => glfw::Key::Tab,
            Self::PrintScreen => glfw::Key::PrintScreen,
            Self::ScrollLock => glfw::Key::ScrollLock,
            Self::Pause => glfw::Key::Pause,
            Self::Insert => glfw::Key::Insert,
            Self::Home => glfw::Key::Home,
            Self::End => glfw::Key::End,
            Self::PageUp => glfw::Key::PageUp,
            Self::PageDown => glfw::Key::PageDown,
        }
    }
}

#[cfg(feature = "glfw")]
impl KeyboardSource for glfw::Window {
    fn is_key_down(&self, key: HotKey) -> bool {
        matches!(
            self.get_key(key.to_glfw()),
            glfw::Action::Press | glfw::Action::Repeat
        )
    }
}

/// Down-edge detector for one key
#[derive(Debug, Clone, Copy)]
pub struct HotkeyDetector {
    key: HotKey,
    was_down: bool,
}

impl HotkeyDetector {
    /// Detector for `key`, initially released
    pub const fn new(key: HotKey) -> Self {
        Self {
            key,
            was_down: false,
        }
    }

    /// Watched key
    pub const fn key(&self) -> HotKey {
        self.key
    }

    /// Poll `source`; true only on the poll where the key goes down
    pub fn poll(&mut self, source: &dyn KeyboardSource) -> bool {
        let down = source.is_key_down(self.key);
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("F12".parse::<HotKey>().unwrap(), HotKey::F12);
        assert_eq!("pageup".parse::<HotKey>().unwrap(), HotKey::PageUp);
        assert!("F13".parse::<HotKey>().is_err());
        for key in HotKey::ALL {
            assert_eq!(key.to_string().parse::<HotKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_detector_fires_on_down_edge_only() {
        let down = Cell::new(false);
        let source = |key: HotKey| key == HotKey::F12 && down.get();
        let mut detector = HotkeyDetector::new(HotKey::F12);

        assert!(!detector.poll(&source));
        down.set(true);
        assert!(detector.poll(&source));
        assert!(!detector.poll(&source));
        down.set(false);
        assert!(!detector.poll(&source));
        down.set(true);
        assert!(detector.poll(&source));
    }
}
