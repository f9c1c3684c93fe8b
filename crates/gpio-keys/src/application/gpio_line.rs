//! GPIO input lines: one pulled-up pin sampled on demand.
//!
//! Buttons are wired active-low: the internal pull-up holds the line high
//! and a closed switch pulls it to ground, so `Level::Low` means pressed.

use thiserror::Error;

/// Instantaneous logic level of an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Error type for GPIO line operations.
#[derive(Debug, Error)]
pub enum LineError {
    /// The GPIO controller itself could not be accessed.
    #[error("GPIO controller unavailable: {reason}")]
    ControllerUnavailable { reason: String },

    /// The pin could not be reserved: already claimed, out of range or
    /// permission denied.
    #[error("GPIO pin {pin} unavailable: {reason}")]
    PinUnavailable { pin: u8, reason: String },

    /// A single sample failed.
    #[error("failed to read GPIO pin {pin}: {reason}")]
    Read { pin: u8, reason: String },
}

/// One pin opened as an input with pull-up bias.
pub trait InputLine: Send {
    /// BCM pin number this line was opened on.
    fn pin(&self) -> u8;

    /// Samples the raw level.  No debouncing or filtering.
    fn read(&mut self) -> Result<Level, LineError>;
}

/// Hands out input lines.  Each pin is opened once at startup and never
/// reconfigured; dropping the returned line releases the pin.
pub trait LineProvider {
    /// Reserves `pin` as an input with internal pull-up.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::PinUnavailable`] if the pin cannot be reserved.
    fn open_input_pull_up(&self, pin: u8) -> Result<Box<dyn InputLine>, LineError>;
}
