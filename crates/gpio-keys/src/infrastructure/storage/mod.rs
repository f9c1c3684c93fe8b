//! Storage infrastructure: the TOML configuration file.
//!
//! The `config` sub-module reads and writes [`config::AppConfig`], falling
//! back to built-in defaults (the reference button layout on a stock
//! `/dev/uinput`) when no file exists.

pub mod config;
