//! Infrastructure layer: kernel, GPIO and file-system adapters.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `gpio_keys_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`virtual_input`** – the uinput keyboard.  `VirtualInputDevice` owns
//!   the creation protocol; the node underneath is either `/dev/uinput`
//!   (Linux) or a recording fake for tests.
//!
//! - **`gpio`** – `LineProvider` implementations: `rppal` on a Raspberry Pi,
//!   scripted lines in tests.
//!
//! - **`storage`** – the TOML configuration file.
//!
//! - **`emulator`** – the `stop_emulator` callback (`pkill`).

pub mod emulator;
pub mod gpio;
pub mod storage;
pub mod virtual_input;

#[cfg(target_os = "linux")]
pub use hardware::{open_hardware, HardwareManager};

#[cfg(target_os = "linux")]
mod hardware {
    use crate::application::button_binding::ButtonCallback;
    use crate::application::key_manager::{KeyManager, StartupError};
    use crate::infrastructure::gpio::rpi::RppalLines;
    use crate::infrastructure::storage::config::AppConfig;
    use crate::infrastructure::virtual_input::linux::LinuxUinputNode;
    use crate::infrastructure::virtual_input::VirtualInputDevice;

    /// A manager driving real buttons into a real uinput keyboard.
    pub type HardwareManager = KeyManager<VirtualInputDevice<LinuxUinputNode>>;

    /// Opens `/dev/uinput` and the GPIO controller described by `config` and
    /// builds the manager.
    ///
    /// Blocks for the device settle delay; call it from a blocking context.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if the device node, the GPIO controller or
    /// any pin cannot be opened, or the button table is invalid.
    pub fn open_hardware(
        config: &AppConfig,
        stop: ButtonCallback,
    ) -> Result<HardwareManager, StartupError> {
        let lines = RppalLines::new().map_err(StartupError::Controller)?;
        let descriptor = config.device.descriptor();
        let settle_delay = config.polling.settle_delay();

        KeyManager::open(
            &config.buttons,
            &lines,
            stop,
            config.polling.interval(),
            |keys| {
                let node = LinuxUinputNode::open(&config.device.uinput_path)?;
                VirtualInputDevice::initialize(node, descriptor, keys.iter().copied(), settle_delay)
            },
        )
    }
}
