//! Application layer: button polling use cases.
//!
//! Nothing in this layer touches the OS.  Hardware is reached through three
//! seams that the infrastructure layer implements:
//!
//! - **`emit_keys`** – [`emit_keys::KeyEmitter`], the virtual keyboard as seen
//!   by the polling loop (key-down, key-up, release).
//! - **`gpio_line`** – [`gpio_line::InputLine`] and
//!   [`gpio_line::LineProvider`], one pulled-up input pin and the controller
//!   that hands them out.
//!
//! On top of those seams:
//!
//! - **`button_binding`** – edge detection for one button and dispatch of the
//!   resulting press/release to a key or a callback.
//! - **`key_manager`** – the fixed-cadence loop that ticks every binding until
//!   the shutdown flag is cleared.

pub mod button_binding;
pub mod emit_keys;
pub mod gpio_line;
pub mod key_manager;
