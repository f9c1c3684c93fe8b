//! # gpio-keys-core
//!
//! Platform-independent building blocks for turning GPIO buttons into
//! keyboard input on Linux.
//!
//! This crate has no OS dependencies: it never opens a file or issues a
//! syscall.  It defines
//!
//! - **`keymap`** – the Linux `KEY_*` codes a button can emit, with the
//!   kernel-header names used in binding tables.
//! - **`protocol`** – the uinput protocol: ioctl request numbers, event type
//!   constants, and a byte-exact codec for `struct input_event` and
//!   `struct uinput_user_dev`.

pub mod keymap;
pub mod protocol;

pub use keymap::{KeyCode, UnknownKeyName};
pub use protocol::codec::{CodecError, DeviceDescriptor, InputEvent};
