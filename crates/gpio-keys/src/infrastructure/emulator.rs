//! The `stop_emulator` button action.
//!
//! Pressing the reset button sends a signal to the running emulator with
//! `pkill -<signal> <process_name>`.  The child is spawned on the tokio
//! runtime and not waited for, so the polling tick is never held up; tokio
//! reaps it in the background.

use std::sync::Arc;

use anyhow::Context;
use tokio::process::Command;
use tracing::info;

use crate::application::button_binding::ButtonCallback;
use crate::infrastructure::storage::config::EmulatorConfig;

const PKILL: &str = "pkill";

/// Arguments passed to `pkill` for `config`.
pub fn pkill_args(config: &EmulatorConfig) -> Vec<String> {
    vec![format!("-{}", config.signal), config.process_name.clone()]
}

/// A callback that signals the configured emulator process.
pub fn stop_emulator_callback(config: &EmulatorConfig) -> ButtonCallback {
    command_callback(PKILL, pkill_args(config))
}

/// A callback that spawns `program args…` and returns as soon as the process
/// has started.
///
/// Must be invoked from within a tokio runtime.
pub fn command_callback(program: impl Into<String>, args: Vec<String>) -> ButtonCallback {
    let program = program.into();
    Arc::new(move || -> anyhow::Result<()> {
        let child = Command::new(&program)
            .args(&args)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        info!(pid = ?child.id(), "spawned {program} {}", args.join(" "));
        Ok(())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
