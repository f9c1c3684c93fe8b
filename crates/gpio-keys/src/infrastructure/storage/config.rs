//! TOML-based configuration for the button bridge.
//!
//! The service reads `/etc/gpio-keys/config.toml` unless `--config` points
//! elsewhere.  Every field has a default, so an absent file or an empty one
//! yields the reference handheld layout:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [device]
//! uinput_path = "/dev/uinput"
//! name = "gba-loader-input-controller"
//! vendor_id = 0x1234
//! product_id = 0x5678
//!
//! [polling]
//! interval_ms = 20
//! settle_delay_ms = 200
//!
//! [emulator]
//! process_name = "mgba"
//! signal = "TERM"
//!
//! [[buttons]]
//! name = "start"
//! pin = 27
//! action = { key = "KEY_ENTER" }
//!
//! [[buttons]]
//! name = "reset"
//! pin = 16
//! action = "stop_emulator"
//! ```
//!
//! A `[[buttons]]` table replaces the reference layout entirely; it is not
//! merged with it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gpio_keys_core::protocol::BUS_USB;
use gpio_keys_core::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::key_manager::{reference_table, validate_table, BindingSpec};
use crate::infrastructure::virtual_input::DEFAULT_UINPUT_PATH;

/// Where the service looks for its configuration by default.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gpio-keys/config.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file parsed but describes something unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub emulator: EmulatorConfig,
    #[serde(default = "reference_table")]
    pub buttons: Vec<BindingSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// The virtual keyboard and the node it is created through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_uinput_path")]
    pub uinput_path: PathBuf,
    /// Name reported to the input stack; at most 79 bytes.
    #[serde(default = "default_device_name")]
    pub name: String,
    #[serde(default = "default_bus_type")]
    pub bus_type: u16,
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    #[serde(default = "default_device_version")]
    pub version: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Pause between ticks.  Also the effective debounce window.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Wait after `UI_DEV_CREATE` before the first tick.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// What the `stop_emulator` action signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmulatorConfig {
    /// Exact process name matched by `pkill`.
    #[serde(default = "default_process_name")]
    pub process_name: String,
    /// Signal name without the `SIG` prefix.
    #[serde(default = "default_signal")]
    pub signal: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_uinput_path() -> PathBuf {
    PathBuf::from(DEFAULT_UINPUT_PATH)
}
fn default_device_name() -> String {
    "gba-loader-input-controller".to_string()
}
fn default_bus_type() -> u16 {
    BUS_USB
}
fn default_vendor_id() -> u16 {
    0x1234
}
fn default_product_id() -> u16 {
    0x5678
}
fn default_device_version() -> u16 {
    1
}
fn default_interval_ms() -> u64 {
    20
}
fn default_settle_delay_ms() -> u64 {
    200
}
fn default_process_name() -> String {
    "mgba".to_string()
}
fn default_signal() -> String {
    "TERM".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            device: DeviceConfig::default(),
            polling: PollingConfig::default(),
            emulator: EmulatorConfig::default(),
            buttons: reference_table(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            uinput_path: default_uinput_path(),
            name: default_device_name(),
            bus_type: default_bus_type(),
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            version: default_device_version(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            signal: default_signal(),
        }
    }
}

impl DeviceConfig {
    /// The `uinput_user_dev` identity for this device.
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            name: self.name.clone(),
            bus_type: self.bus_type,
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            version: self.version,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl AppConfig {
    /// Rejects configurations the service cannot start with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a bad button table, a device name
    /// that does not fit `uinput_user_dev`, a zero poll interval or settle
    /// delay, or an unusable emulator process name or signal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_table(&self.buttons).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        self.device
            .descriptor()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[device] name: {e}")))?;

        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "[polling] interval_ms must be at least 1".into(),
            ));
        }
        if self.polling.settle_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "[polling] settle_delay_ms must be at least 1".into(),
            ));
        }

        if self.emulator.process_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "[emulator] process_name must not be empty".into(),
            ));
        }
        let signal = &self.emulator.signal;
        if signal.is_empty() || !signal.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Invalid(format!(
                "[emulator] signal {signal:?} is not a signal name or number"
            )));
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Parses `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// The result is not validated: callers apply their overrides first and then
/// call [`AppConfig::validate`] once.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found"
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str::<AppConfig>(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Renders `config` as pretty TOML.
///
/// # Errors
///
/// Returns [`ConfigError::Serialize`] if serialization fails.
pub fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
