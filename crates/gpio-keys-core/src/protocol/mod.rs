//! The uinput protocol: constants, ioctl request numbers and the binary codec.
//!
//! A virtual keyboard is created by a privileged process talking to
//! `/dev/uinput`:
//!
//! ```text
//! open("/dev/uinput", O_WRONLY)
//! ioctl(UI_SET_EVBIT, EV_KEY)      ┐
//! ioctl(UI_SET_EVBIT, EV_SYN)      │ capability registration,
//! ioctl(UI_SET_KEYBIT, code) × N   ┘ must precede UI_DEV_CREATE
//! write(uinput_user_dev)             1116-byte descriptor
//! ioctl(UI_DEV_CREATE)
//! write(input_event) …               key + SYN_REPORT records
//! ioctl(UI_DEV_DESTROY)
//! close()
//! ```
//!
//! The kernel does not validate the layout of what is written.  A record with
//! the wrong size or field order is accepted and silently produces a device
//! that never delivers usable events, so the codec in [`codec`] builds every
//! byte explicitly.

pub mod codec;

pub use codec::{CodecError, DeviceDescriptor, InputEvent};

// ── Event types and codes ─────────────────────────────────────────────────────

/// Synchronization events (`EV_SYN`).
pub const EV_SYN: u16 = 0x00;
/// Key and button events (`EV_KEY`).
pub const EV_KEY: u16 = 0x01;
/// Marks the end of one atomic group of events.
pub const SYN_REPORT: u16 = 0;

/// `EV_KEY` value for a key press.
pub const KEY_PRESSED: i32 = 1;
/// `EV_KEY` value for a key release.
pub const KEY_RELEASED: i32 = 0;

/// `BUS_USB` from `linux/input.h`.
pub const BUS_USB: u16 = 0x03;

// ── Layout constants ──────────────────────────────────────────────────────────

/// Size of the NUL-padded name field in `uinput_user_dev`.
pub const UINPUT_MAX_NAME_SIZE: usize = 80;
/// Number of absolute axes (`ABS_CNT`); length of each abs* array.
pub const ABS_CNT: usize = 64;

/// Size of the `struct timeval` header of an `input_event`: two native `long`s.
pub const TIMESTAMP_SIZE: usize = 2 * std::mem::size_of::<isize>();
/// Size of one `struct input_event` on the build target.
pub const INPUT_EVENT_SIZE: usize = TIMESTAMP_SIZE + 2 + 2 + 4;
/// Size of `struct uinput_user_dev`.
pub const DESCRIPTOR_SIZE: usize = UINPUT_MAX_NAME_SIZE + 4 * 2 + 4 + 4 * ABS_CNT * 4;

// ── ioctl request numbers ─────────────────────────────────────────────────────

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;

const UINPUT_IOCTL_BASE: u8 = b'U';

const fn ioc(dir: u32, ty: u8, nr: u32, size: u32) -> u32 {
    (dir << IOC_DIRSHIFT) | ((ty as u32) << IOC_TYPESHIFT) | (nr << IOC_NRSHIFT) | (size << IOC_SIZESHIFT)
}

const fn io(ty: u8, nr: u32) -> u32 {
    ioc(IOC_NONE, ty, nr, 0)
}

const fn iow(ty: u8, nr: u32, size: u32) -> u32 {
    ioc(IOC_WRITE, ty, nr, size)
}

/// `_IO('U', 1)`: create the device described by the last descriptor write.
pub const UI_DEV_CREATE: u32 = io(UINPUT_IOCTL_BASE, 1);
/// `_IO('U', 2)`: remove the device from the system.
pub const UI_DEV_DESTROY: u32 = io(UINPUT_IOCTL_BASE, 2);
/// `_IOW('U', 100, int)`: enable an event type.
pub const UI_SET_EVBIT: u32 = iow(UINPUT_IOCTL_BASE, 100, std::mem::size_of::<i32>() as u32);
/// `_IOW('U', 101, int)`: enable a key code.
pub const UI_SET_KEYBIT: u32 = iow(UINPUT_IOCTL_BASE, 101, std::mem::size_of::<i32>() as u32);
