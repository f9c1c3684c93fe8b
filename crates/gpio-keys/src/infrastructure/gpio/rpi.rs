//! Raspberry Pi GPIO via `rppal`.
//!
//! Pins use BCM numbering.  `rppal` talks to `/dev/gpiomem` (or
//! `/dev/mem` as root), so the service user needs to be in the `gpio` group.
//! A pin stays claimed for as long as its [`GpioLine`] lives; dropping the
//! line resets the pin to its previous mode.

use rppal::gpio::{self, Gpio, InputPin};
use tracing::debug;

use crate::application::gpio_line::{InputLine, Level, LineError, LineProvider};

/// Opens pins on the SoC's GPIO controller.
#[derive(Debug)]
pub struct RppalLines {
    gpio: Gpio,
}

impl RppalLines {
    /// Connects to the GPIO controller.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::ControllerUnavailable`] if the controller cannot
    /// be accessed at all.
    pub fn new() -> Result<Self, LineError> {
        let gpio = Gpio::new().map_err(|e| LineError::ControllerUnavailable {
            reason: e.to_string(),
        })?;
        Ok(Self { gpio })
    }
}

impl LineProvider for RppalLines {
    fn open_input_pull_up(&self, pin: u8) -> Result<Box<dyn InputLine>, LineError> {
        let input = self
            .gpio
            .get(pin)
            .map_err(|e| LineError::PinUnavailable {
                pin,
                reason: e.to_string(),
            })?
            .into_input_pullup();
        debug!(pin, "GPIO input opened with pull-up");
        Ok(Box::new(GpioLine { pin, input }))
    }
}

/// One claimed input pin.
#[derive(Debug)]
pub struct GpioLine {
    pin: u8,
    input: InputPin,
}

impl InputLine for GpioLine {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn read(&mut self) -> Result<Level, LineError> {
        Ok(match self.input.read() {
            gpio::Level::Low => Level::Low,
            gpio::Level::High => Level::High,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
