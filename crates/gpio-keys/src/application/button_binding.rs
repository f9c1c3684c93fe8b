//! ButtonBinding: edge detection for one button and dispatch of its action.
//!
//! Each tick the binding samples its line once and compares the result to the
//! previous sample:
//!
//! | previous  | current   | edge       | `KeyEmission`  | `Callback`   |
//! |-----------|-----------|------------|----------------|--------------|
//! | released  | pressed   | `Pressed`  | `key_down`     | invoke       |
//! | pressed   | released  | `Released` | `key_up`       | nothing      |
//! | same      | same      | none       | nothing        | nothing      |
//!
//! The remembered state is overwritten with the current sample after every
//! successful read, whether or not dispatch succeeded.  A failed key write
//! therefore costs at most that one event and never leaves the binding out of
//! step with the hardware.

use std::fmt;
use std::sync::Arc;

use gpio_keys_core::KeyCode;
use thiserror::Error;

use super::emit_keys::{DeviceError, KeyEmitter};
use super::gpio_line::{InputLine, Level, LineError};

/// A zero-argument action run on a button's press edge.
///
/// Runs synchronously inside the polling tick, so it must return promptly.
pub type ButtonCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// What a button does.
#[derive(Clone)]
pub enum BindingAction {
    /// Press and release the key in step with the button.
    KeyEmission(KeyCode),
    /// Run the callback once per press; releases are ignored.
    Callback(ButtonCallback),
}

impl fmt::Debug for BindingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyEmission(key) => f.debug_tuple("KeyEmission").field(key).finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// A transition observed between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

/// A failure during one binding's tick.  Logged and swallowed by the loop.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("sample failed: {0}")]
    Read(#[from] LineError),
    #[error("key emission failed: {0}")]
    Emit(#[from] DeviceError),
    #[error("callback failed: {0:#}")]
    Callback(anyhow::Error),
}

/// One physical button: its line, its action and its last sampled state.
pub struct ButtonBinding {
    name: String,
    line: Box<dyn InputLine>,
    action: BindingAction,
    last_pressed: bool,
}

impl ButtonBinding {
    /// Binds `line` to `action`.  The button starts out released.
    pub fn new(name: impl Into<String>, line: Box<dyn InputLine>, action: BindingAction) -> Self {
        Self {
            name: name.into(),
            line,
            action,
            last_pressed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pin(&self) -> u8 {
        self.line.pin()
    }

    /// State recorded by the most recent successful sample.
    pub fn is_pressed(&self) -> bool {
        self.last_pressed
    }

    /// Samples the line, dispatches any edge, and records the sample.
    ///
    /// Returns the edge that was observed, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Read`] if the line could not be sampled (the
    /// remembered state is left unchanged), or [`PollError::Emit`] /
    /// [`PollError::Callback`] if dispatch failed (the remembered state has
    /// already been updated).
    pub fn check(&mut self, emitter: &mut dyn KeyEmitter) -> Result<Option<Edge>, PollError> {
        let pressed = self.line.read()? == Level::Low;

        let edge = match (self.last_pressed, pressed) {
            (false, true) => Some(Edge::Pressed),
            (true, false) => Some(Edge::Released),
            _ => None,
        };

        let dispatched = match edge {
            Some(edge) => self.dispatch(edge, emitter),
            None => Ok(()),
        };
        self.last_pressed = pressed;

        dispatched.map(|()| edge)
    }

    fn dispatch(&self, edge: Edge, emitter: &mut dyn KeyEmitter) -> Result<(), PollError> {
        match (&self.action, edge) {
            (BindingAction::KeyEmission(key), Edge::Pressed) => emitter.key_down(*key)?,
            (BindingAction::KeyEmission(key), Edge::Released) => emitter.key_up(*key)?,
            (BindingAction::Callback(callback), Edge::Pressed) => {
                callback().map_err(PollError::Callback)?
            }
            (BindingAction::Callback(_), Edge::Released) => {}
        }
        Ok(())
    }
}

impl fmt::Debug for ButtonBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonBinding")
            .field("name", &self.name)
            .field("pin", &self.line.pin())
            .field("action", &self.action)
            .field("last_pressed", &self.last_pressed)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
