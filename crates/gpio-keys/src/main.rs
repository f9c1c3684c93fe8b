//! gpio-keys service entry point.
//!
//! # Usage
//!
//! ```text
//! gpio-keys [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML config file [default: /etc/gpio-keys/config.toml]
//!   --uinput-path <PATH>         Override [device] uinput_path
//!   --poll-interval-ms <MS>      Override [polling] interval_ms
//!   --print-default-config       Print the built-in configuration and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                     | Flag                 |
//! |------------------------------|----------------------|
//! | `GPIO_KEYS_CONFIG`           | `--config`           |
//! | `GPIO_KEYS_UINPUT_PATH`      | `--uinput-path`      |
//! | `GPIO_KEYS_POLL_INTERVAL_MS` | `--poll-interval-ms` |
//!
//! `RUST_LOG` takes precedence over `[general] log_level`.
//!
//! # Lifecycle
//!
//! ```text
//! load config ─▶ create virtual keyboard ─▶ open pins ─▶ poll every 20 ms
//!                                                            │
//!                          Ctrl-C / SIGTERM clears `running` ┘
//!                                                            ▼
//!                              finish tick ─▶ destroy keyboard ─▶ exit
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gpio_keys::infrastructure::storage::config::{
    load_config, to_toml, AppConfig, DEFAULT_CONFIG_PATH,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Turns GPIO push buttons into a uinput virtual keyboard.
#[derive(Debug, Parser)]
#[command(name = "gpio-keys", version)]
struct Cli {
    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "GPIO_KEYS_CONFIG")]
    config: PathBuf,

    /// uinput control node, overriding the config file.
    #[arg(long, env = "GPIO_KEYS_UINPUT_PATH")]
    uinput_path: Option<PathBuf>,

    /// Poll interval in milliseconds, overriding the config file.
    #[arg(long, env = "GPIO_KEYS_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Print the built-in configuration as TOML and exit.
    #[arg(long)]
    print_default_config: bool,
}

impl Cli {
    /// Loads the config file, applies command-line overrides and validates
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged configuration fails validation.
    fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;
        self.apply_overrides(&mut config);
        config
            .validate()
            .with_context(|| format!("invalid configuration from {}", self.config.display()))?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(path) = &self.uinput_path {
            config.device.uinput_path = path.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.polling.interval_ms = ms;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", to_toml(&AppConfig::default())?);
        return Ok(());
    }

    let config = cli.resolve_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.general.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        config = %cli.config.display(),
        uinput = %config.device.uinput_path.display(),
        buttons = config.buttons.len(),
        "gpio-keys starting"
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        running_clone.store(false, Ordering::Relaxed);
    });

    run(config, running).await?;

    info!("gpio-keys stopped");
    Ok(())
}

#[cfg(target_os = "linux")]
async fn run(config: AppConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    use gpio_keys::infrastructure::emulator::stop_emulator_callback;
    use gpio_keys::infrastructure::open_hardware;

    let stop = stop_emulator_callback(&config.emulator);

    // Device creation sleeps for the settle delay.
    let mut manager = tokio::task::spawn_blocking(move || open_hardware(&config, stop))
        .await
        .context("startup task failed")?
        .context("failed to start the button bridge")?;

    manager.run(running).await;
    manager.shutdown();
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(_config: AppConfig, _running: Arc<AtomicBool>) -> anyhow::Result<()> {
    anyhow::bail!("gpio-keys needs Linux: uinput and GPIO are not available on this platform")
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!("failed to listen for Ctrl+C: {e}");
                        }
                        info!("received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => error!("failed to install SIGTERM handler: {e}"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => error!("failed to listen for Ctrl+C: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["gpio-keys"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/gpio-keys/config.toml"));
        assert!(cli.uinput_path.is_none());
        assert!(cli.poll_interval_ms.is_none());
        assert!(!cli.print_default_config);
    }

    #[test]
    fn test_cli_overrides_parse() {
        let cli = Cli::try_parse_from([
            "gpio-keys",
            "--config",
            "/tmp/pad.toml",
            "--uinput-path",
            "/dev/input/uinput",
            "--poll-interval-ms",
            "5",
            "--print-default-config",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/tmp/pad.toml"));
        assert_eq!(cli.uinput_path, Some(PathBuf::from("/dev/input/uinput")));
        assert_eq!(cli.poll_interval_ms, Some(5));
        assert!(cli.print_default_config);
    }

    #[test]
    fn test_resolve_config_applies_overrides_to_missing_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: dir.path().join("absent.toml"),
            uinput_path: Some(PathBuf::from("/dev/input/uinput")),
            poll_interval_ms: Some(10),
            print_default_config: false,
        };

        // Act
        let config = cli.resolve_config().unwrap();

        // Assert
        assert_eq!(config.device.uinput_path, PathBuf::from("/dev/input/uinput"));
        assert_eq!(config.polling.interval(), Duration::from_millis(10));
        assert_eq!(config.buttons.len(), 11);
    }

    #[test]
    fn test_zero_poll_interval_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: dir.path().join("absent.toml"),
            uinput_path: None,
            poll_interval_ms: Some(0),
            print_default_config: false,
        };

        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_poll_interval_override_repairs_invalid_file_value() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling]\ninterval_ms = 0\n").unwrap();
        let cli = Cli::try_parse_from([
            "gpio-keys",
            "--config",
            path.to_str().unwrap(),
            "--poll-interval-ms",
            "20",
        ])
        .unwrap();

        // Act
        let config = cli.resolve_config().unwrap();

        // Assert
        assert_eq!(config.polling.interval_ms, 20);
    }

    #[test]
    fn test_invalid_file_value_without_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling]\ninterval_ms = 0\n").unwrap();
        let cli = Cli::try_parse_from(["gpio-keys", "--config", path.to_str().unwrap()]).unwrap();

        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_resolve_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[emulator]\nprocess_name = \"retroarch\"\n").unwrap();
        let cli = Cli::try_parse_from(["gpio-keys", "--config", path.to_str().unwrap()]).unwrap();

        let config = cli.resolve_config().unwrap();

        assert_eq!(config.emulator.process_name, "retroarch");
    }
}
