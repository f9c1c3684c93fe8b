//! `/dev/uinput` backed by real file I/O and `ioctl(2)`.
//!
//! # What is uinput? (for beginners)
//!
//! uinput is a kernel module that lets a user-space process create an input
//! device.  The process opens `/dev/uinput`, declares which event types and
//! key codes the device can produce, writes a `uinput_user_dev` describing
//! the device, and issues `UI_DEV_CREATE`.  From then on every
//! `input_event` written to the handle is delivered to consumers (X11,
//! Wayland compositors, SDL, the console) as if it came from hardware.
//!
//! # Permissions
//!
//! `/dev/uinput` is normally `root:root 0600`.  Either run as root or add a
//! udev rule granting the service user write access, e.g.
//!
//! ```text
//! KERNEL=="uinput", GROUP="input", MODE="0660"
//! ```
//!
//! Without access, [`LinuxUinputNode::open`] fails with
//! [`DeviceError::Unavailable`].

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use gpio_keys_core::protocol::{UI_DEV_CREATE, UI_DEV_DESTROY, UI_SET_EVBIT, UI_SET_KEYBIT};
use tracing::debug;

use super::UinputNode;
use crate::application::emit_keys::DeviceError;

/// An open, write-only handle on a uinput control node.
#[derive(Debug)]
pub struct LinuxUinputNode {
    file: File,
    path: PathBuf,
}

impl LinuxUinputNode {
    /// Opens `path` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unavailable`] if the node is missing or not
    /// writable by this process.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| DeviceError::Unavailable {
                context: format!("open {}", path.display()),
                source,
            })?;
        debug!(path = %path.display(), "uinput node opened");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ioctl(&self, request: u32, arg: libc::c_ulong) -> io::Result<()> {
        // SAFETY: the descriptor is owned by `self.file` and stays open for the
        // duration of the call; every uinput request used here takes either no
        // argument or a plain integer.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl UinputNode for LinuxUinputNode {
    fn set_event_bit(&mut self, event_type: u16) -> io::Result<()> {
        self.ioctl(UI_SET_EVBIT, libc::c_ulong::from(event_type))
    }

    fn set_key_bit(&mut self, code: u16) -> io::Result<()> {
        self.ioctl(UI_SET_KEYBIT, libc::c_ulong::from(code))
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    fn create(&mut self) -> io::Result<()> {
        self.ioctl(UI_DEV_CREATE, 0)
    }

    fn destroy(&mut self) -> io::Result<()> {
        self.ioctl(UI_DEV_DESTROY, 0)
    }
}
