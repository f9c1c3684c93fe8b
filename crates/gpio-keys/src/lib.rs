//! gpio-keys library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does gpio-keys do? (for beginners)
//!
//! A handheld built around a Raspberry Pi has physical buttons wired to GPIO
//! pins, but the software it runs (an emulator, a launcher menu) only
//! understands keyboards.  gpio-keys bridges the two:
//!
//! 1. Creates a virtual keyboard through the kernel's uinput facility and
//!    registers every key the button table can produce.
//! 2. Opens each button's pin as a pulled-up input.
//! 3. Every 20 ms, samples every pin and turns press and release edges into
//!    key-down and key-up events, or runs a callback (the reset button stops
//!    the emulator).
//! 4. On Ctrl-C or SIGTERM, finishes the current tick, destroys the virtual
//!    keyboard and releases the pins.

/// Application layer: edge detection, the polling loop and its seams.
pub mod application;

/// Infrastructure layer: uinput, GPIO, configuration and process adapters.
pub mod infrastructure;
