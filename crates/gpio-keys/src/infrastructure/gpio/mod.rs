//! GPIO line providers.
//!
//! - `rpi` – [`rpi::RppalLines`], Raspberry Pi GPIO through `rppal`
//!   (Linux only).
//! - `mock` – [`mock::MockLineProvider`], scripted lines for tests.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod rpi;
