//! The uinput virtual keyboard.
//!
//! [`VirtualInputDevice`] runs the creation protocol against a [`UinputNode`]
//! and then serves as the polling loop's [`KeyEmitter`].  The node is the only
//! part that touches the kernel:
//!
//! - `linux` – [`linux::LinuxUinputNode`], a write-only handle on
//!   `/dev/uinput` driven with `ioctl(2)` and `write(2)`.
//! - `mock` – [`mock::RecordingUinputNode`], which records every call so
//!   tests can assert on protocol order and on the exact bytes written.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──▶ Open ──destroy()/drop──▶ Destroyed
//!        │                                                    ▲
//!        └──────────── any protocol step fails ───────────────┘
//! ```
//!
//! Every key code is registered before `UI_DEV_CREATE`.  A code registered
//! afterwards is accepted by the kernel but never delivered, so the full set
//! is fixed at initialization and emission of any other code is rejected.

use std::collections::BTreeSet;
use std::io;
use std::time::Duration;

use gpio_keys_core::protocol::{EV_KEY, EV_SYN};
use gpio_keys_core::{DeviceDescriptor, InputEvent, KeyCode};
use tracing::{debug, info, trace, warn};

use crate::application::emit_keys::{DeviceError, KeyEmitter};

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

/// The uinput control node on a standard Linux system.
pub const DEFAULT_UINPUT_PATH: &str = "/dev/uinput";

/// Default post-creation wait before events are trusted to be delivered.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// The kernel-facing operations of an open uinput handle.
///
/// Closing the handle is done by dropping it.
pub trait UinputNode: Send {
    /// `ioctl(UI_SET_EVBIT, event_type)`.
    fn set_event_bit(&mut self, event_type: u16) -> io::Result<()>;

    /// `ioctl(UI_SET_KEYBIT, code)`.
    fn set_key_bit(&mut self, code: u16) -> io::Result<()>;

    /// Writes one complete structure.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// `ioctl(UI_DEV_CREATE)`.
    fn create(&mut self) -> io::Result<()>;

    /// `ioctl(UI_DEV_DESTROY)`.
    fn destroy(&mut self) -> io::Result<()>;
}

/// Where a [`VirtualInputDevice`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Open,
    Destroyed,
}

/// A kernel-visible synthetic keyboard.
pub struct VirtualInputDevice<N: UinputNode> {
    node: Option<N>,
    state: DeviceState,
    created: bool,
    descriptor: DeviceDescriptor,
    keys: BTreeSet<KeyCode>,
}

impl<N: UinputNode> VirtualInputDevice<N> {
    /// Registers capabilities, writes the descriptor, creates the device and
    /// waits `settle_delay` for the OS to enumerate it.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unavailable`] if any step is rejected.  The node
    /// is closed before returning.
    pub fn initialize(
        node: N,
        descriptor: DeviceDescriptor,
        keys: impl IntoIterator<Item = KeyCode>,
        settle_delay: Duration,
    ) -> Result<Self, DeviceError> {
        let mut device = Self {
            node: Some(node),
            state: DeviceState::Uninitialized,
            created: false,
            descriptor,
            keys: keys.into_iter().collect(),
        };

        device.register_and_create()?;

        if !settle_delay.is_zero() {
            std::thread::sleep(settle_delay);
        }
        device.state = DeviceState::Open;

        info!(
            name = %device.descriptor.name,
            vendor = %format!("{:#06x}", device.descriptor.vendor_id),
            product = %format!("{:#06x}", device.descriptor.product_id),
            keys = device.keys.len(),
            "virtual keyboard created"
        );
        Ok(device)
    }

    fn register_and_create(&mut self) -> Result<(), DeviceError> {
        let node = self.node.as_mut().ok_or(DeviceError::NotInitialized)?;

        for event_type in [EV_KEY, EV_SYN] {
            node.set_event_bit(event_type)
                .map_err(|e| unavailable(format!("UI_SET_EVBIT {event_type}"), e))?;
        }
        for key in &self.keys {
            node.set_key_bit(key.as_u16())
                .map_err(|e| unavailable(format!("UI_SET_KEYBIT {key}"), e))?;
        }

        let descriptor = self.descriptor.encode().map_err(|e| {
            unavailable(
                "encode uinput_user_dev",
                io::Error::new(io::ErrorKind::InvalidInput, e),
            )
        })?;
        node.write_all(&descriptor)
            .map_err(|e| unavailable("write uinput_user_dev", e))?;

        node.create().map_err(|e| unavailable("UI_DEV_CREATE", e))?;
        self.created = true;
        debug!(keys = ?self.keys, "UI_DEV_CREATE accepted");
        Ok(())
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// The capability set fixed at initialization.
    pub fn keys(&self) -> &BTreeSet<KeyCode> {
        &self.keys
    }

    fn emit(&mut self, key: KeyCode, pressed: bool) -> Result<(), DeviceError> {
        if self.state != DeviceState::Open {
            return Err(DeviceError::NotInitialized);
        }
        if !self.keys.contains(&key) {
            return Err(DeviceError::UnregisteredKey(key));
        }
        let node = self.node.as_mut().ok_or(DeviceError::NotInitialized)?;

        node.write_all(&InputEvent::key(key.as_u16(), pressed).encode())
            .map_err(DeviceError::Write)?;
        node.write_all(&InputEvent::sync().encode())
            .map_err(DeviceError::Write)?;

        trace!(%key, pressed, "key event emitted");
        Ok(())
    }

    /// Removes the device and closes the node.
    ///
    /// `UI_DEV_DESTROY` is only issued if creation succeeded, and a failure
    /// there is logged and ignored.  Calling this again does nothing.
    pub fn destroy(&mut self) {
        let Some(mut node) = self.node.take() else {
            return;
        };
        if self.created {
            match node.destroy() {
                Ok(()) => info!(name = %self.descriptor.name, "virtual keyboard destroyed"),
                Err(e) => warn!("UI_DEV_DESTROY failed: {e}"),
            }
            self.created = false;
        }
        drop(node);
        self.state = DeviceState::Destroyed;
    }
}

impl<N: UinputNode> KeyEmitter for VirtualInputDevice<N> {
    fn key_down(&mut self, key: KeyCode) -> Result<(), DeviceError> {
        self.emit(key, true)
    }

    fn key_up(&mut self, key: KeyCode) -> Result<(), DeviceError> {
        self.emit(key, false)
    }

    fn release(&mut self) {
        self.destroy();
    }
}

impl<N: UinputNode> Drop for VirtualInputDevice<N> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn unavailable(context: impl Into<String>, source: io::Error) -> DeviceError {
    DeviceError::Unavailable {
        context: context.into(),
        source,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
