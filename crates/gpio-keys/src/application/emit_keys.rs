//! KeyEmitter: the virtual keyboard as seen by the polling loop.
//!
//! The production implementation is
//! [`VirtualInputDevice`](crate::infrastructure::virtual_input::VirtualInputDevice),
//! which writes uinput records to the kernel.

use gpio_keys_core::KeyCode;
use thiserror::Error;

/// Error type for virtual keyboard operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device node could not be opened or the kernel rejected a step of
    /// the creation protocol (missing driver, permissions).
    #[error("virtual input device unavailable ({context}): {source}")]
    Unavailable {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Emission was attempted before creation or after teardown.
    #[error("virtual input device not initialized")]
    NotInitialized,

    /// The key was not part of the capability set registered at creation.
    #[error("{0} was not registered with the virtual input device")]
    UnregisteredKey(KeyCode),

    /// Writing an event record to the device failed.
    #[error("failed to write input event: {0}")]
    Write(#[source] std::io::Error),
}

/// Synthesizes key transitions on a virtual keyboard.
///
/// Owned exclusively by the polling loop, hence `&mut self` and no locking.
#[cfg_attr(test, mockall::automock)]
pub trait KeyEmitter: Send {
    /// Emits a key press followed by a sync report.
    fn key_down(&mut self, key: KeyCode) -> Result<(), DeviceError>;

    /// Emits a key release followed by a sync report.
    fn key_up(&mut self, key: KeyCode) -> Result<(), DeviceError>;

    /// Tears the device down.  Idempotent; later emissions fail with
    /// [`DeviceError::NotInitialized`].
    fn release(&mut self);
}
