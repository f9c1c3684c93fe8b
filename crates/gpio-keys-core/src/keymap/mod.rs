//! Linux input key codes (`include/uapi/linux/input-event-codes.h`).
//!
//! These are the numeric codes the kernel expects in the `code` field of an
//! `EV_KEY` record and in `UI_SET_KEYBIT` registrations.  Only the keys a
//! button panel can sensibly emit are listed: letters, digits, the editing
//! and navigation cluster, modifiers and function keys.
//!
//! # Names
//!
//! Each code has a canonical `KEY_*` name identical to the kernel header, so
//! binding tables can be written the way the rest of the Linux input stack
//! spells them:
//!
//! ```toml
//! [[buttons]]
//! name = "start"
//! pin = 27
//! action = { key = "KEY_ENTER" }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a key name does not match any known `KEY_*` constant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKeyName(pub String);

/// Linux input key code.
///
/// The numeric value of each variant is the kernel's `KEY_*` constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u16)]
pub enum KeyCode {
    Esc = 1,
    Digit1 = 2,
    Digit2 = 3,
    Digit3 = 4,
    Digit4 = 5,
    Digit5 = 6,
    Digit6 = 7,
    Digit7 = 8,
    Digit8 = 9,
    Digit9 = 10,
    Digit0 = 11,
    Backspace = 14,
    Tab = 15,
    Q = 16,
    W = 17,
    E = 18,
    R = 19,
    T = 20,
    Y = 21,
    U = 22,
    I = 23,
    O = 24,
    P = 25,
    Enter = 28,
    LeftCtrl = 29,
    A = 30,
    S = 31,
    D = 32,
    F = 33,
    G = 34,
    H = 35,
    J = 36,
    K = 37,
    L = 38,
    LeftShift = 42,
    Z = 44,
    X = 45,
    C = 46,
    V = 47,
    B = 48,
    N = 49,
    M = 50,
    RightShift = 54,
    LeftAlt = 56,
    Space = 57,
    F1 = 59,
    F2 = 60,
    F3 = 61,
    F4 = 62,
    F5 = 63,
    F6 = 64,
    F7 = 65,
    F8 = 66,
    F9 = 67,
    F10 = 68,
    F11 = 87,
    F12 = 88,
    RightCtrl = 97,
    RightAlt = 100,
    Home = 102,
    Up = 103,
    PageUp = 104,
    Left = 105,
    Right = 106,
    End = 107,
    Down = 108,
    PageDown = 109,
    Insert = 110,
    Delete = 111,
}

/// Every supported key paired with its kernel header name.
const KEY_NAMES: &[(KeyCode, &str)] = &[
    (KeyCode::Esc, "KEY_ESC"),
    (KeyCode::Digit1, "KEY_1"),
    (KeyCode::Digit2, "KEY_2"),
    (KeyCode::Digit3, "KEY_3"),
    (KeyCode::Digit4, "KEY_4"),
    (KeyCode::Digit5, "KEY_5"),
    (KeyCode::Digit6, "KEY_6"),
    (KeyCode::Digit7, "KEY_7"),
    (KeyCode::Digit8, "KEY_8"),
    (KeyCode::Digit9, "KEY_9"),
    (KeyCode::Digit0, "KEY_0"),
    (KeyCode::Backspace, "KEY_BACKSPACE"),
    (KeyCode::Tab, "KEY_TAB"),
    (KeyCode::Q, "KEY_Q"),
    (KeyCode::W, "KEY_W"),
    (KeyCode::E, "KEY_E"),
    (KeyCode::R, "KEY_R"),
    (KeyCode::T, "KEY_T"),
    (KeyCode::Y, "KEY_Y"),
    (KeyCode::U, "KEY_U"),
    (KeyCode::I, "KEY_I"),
    (KeyCode::O, "KEY_O"),
    (KeyCode::P, "KEY_P"),
    (KeyCode::Enter, "KEY_ENTER"),
    (KeyCode::LeftCtrl, "KEY_LEFTCTRL"),
    (KeyCode::A, "KEY_A"),
    (KeyCode::S, "KEY_S"),
    (KeyCode::D, "KEY_D"),
    (KeyCode::F, "KEY_F"),
    (KeyCode::G, "KEY_G"),
    (KeyCode::H, "KEY_H"),
    (KeyCode::J, "KEY_J"),
    (KeyCode::K, "KEY_K"),
    (KeyCode::L, "KEY_L"),
    (KeyCode::LeftShift, "KEY_LEFTSHIFT"),
    (KeyCode::Z, "KEY_Z"),
    (KeyCode::X, "KEY_X"),
    (KeyCode::C, "KEY_C"),
    (KeyCode::V, "KEY_V"),
    (KeyCode::B, "KEY_B"),
    (KeyCode::N, "KEY_N"),
    (KeyCode::M, "KEY_M"),
    (KeyCode::RightShift, "KEY_RIGHTSHIFT"),
    (KeyCode::LeftAlt, "KEY_LEFTALT"),
    (KeyCode::Space, "KEY_SPACE"),
    (KeyCode::F1, "KEY_F1"),
    (KeyCode::F2, "KEY_F2"),
    (KeyCode::F3, "KEY_F3"),
    (KeyCode::F4, "KEY_F4"),
    (KeyCode::F5, "KEY_F5"),
    (KeyCode::F6, "KEY_F6"),
    (KeyCode::F7, "KEY_F7"),
    (KeyCode::F8, "KEY_F8"),
    (KeyCode::F9, "KEY_F9"),
    (KeyCode::F10, "KEY_F10"),
    (KeyCode::F11, "KEY_F11"),
    (KeyCode::F12, "KEY_F12"),
    (KeyCode::RightCtrl, "KEY_RIGHTCTRL"),
    (KeyCode::RightAlt, "KEY_RIGHTALT"),
    (KeyCode::Home, "KEY_HOME"),
    (KeyCode::Up, "KEY_UP"),
    (KeyCode::PageUp, "KEY_PAGEUP"),
    (KeyCode::Left, "KEY_LEFT"),
    (KeyCode::Right, "KEY_RIGHT"),
    (KeyCode::End, "KEY_END"),
    (KeyCode::Down, "KEY_DOWN"),
    (KeyCode::PageDown, "KEY_PAGEDOWN"),
    (KeyCode::Insert, "KEY_INSERT"),
    (KeyCode::Delete, "KEY_DELETE"),
];

impl KeyCode {
    /// Returns the kernel code written into `EV_KEY` records.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Looks up a key by its kernel code.
    ///
    /// Returns `None` for codes outside the supported set.
    pub fn from_u16(code: u16) -> Option<Self> {
        KEY_NAMES
            .iter()
            .find(|(key, _)| key.as_u16() == code)
            .map(|(key, _)| *key)
    }

    /// Returns the `KEY_*` name from the kernel header.
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(key, _)| *key == self)
            .map(|(_, name)| *name)
            .unwrap_or("KEY_RESERVED")
    }

    /// Iterates over every supported key in ascending code order.
    pub fn all() -> impl Iterator<Item = KeyCode> {
        KEY_NAMES.iter().map(|(key, _)| *key)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyCode {
    type Err = UnknownKeyName;

    /// Parses a `KEY_*` name.  The `KEY_` prefix is optional and matching is
    /// case-insensitive, so `"KEY_ENTER"`, `"enter"` and `"Enter"` all work.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let wanted = if upper.starts_with("KEY_") {
            upper
        } else {
            format!("KEY_{upper}")
        };
        KEY_NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(key, _)| *key)
            .ok_or_else(|| UnknownKeyName(trimmed.to_string()))
    }
}

impl TryFrom<String> for KeyCode {
    type Error = UnknownKeyName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyCode> for String {
    fn from(key: KeyCode) -> Self {
        key.name().to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
