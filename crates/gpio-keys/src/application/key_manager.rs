//! KeyManager: owns every button binding and the virtual keyboard and drives
//! them on a fixed-interval loop.
//!
//! # Tick discipline
//!
//! ```text
//! while running:
//!     for binding in table order:      ← a failure is logged, never fatal
//!         binding.check(emitter)
//!     sleep(poll_interval)
//! ```
//!
//! The shutdown flag is only consulted between ticks, so a tick that has
//! started always checks every binding before the loop can exit.  The only
//! debounce is the poll interval itself.
//!
//! # Startup
//!
//! [`KeyManager::open`] turns a declarative [`BindingSpec`] table into live
//! bindings: it validates the table, creates the virtual keyboard with the
//! union of all key codes the table can emit, then opens one line per button.
//! Any failure here is a [`StartupError`] and is fatal to the caller.

use std::collections::{BTreeSet, HashSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use gpio_keys_core::KeyCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time;
use tracing::{debug, info, warn};

use super::button_binding::{BindingAction, ButtonBinding, ButtonCallback, Edge};
use super::emit_keys::{DeviceError, KeyEmitter};
use super::gpio_line::{LineError, LineProvider};

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

// ── Binding table ─────────────────────────────────────────────────────────────

/// What a button in the binding table is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    /// Emit this key while the button is held.
    Key(KeyCode),
    /// Run the externally supplied stop callback on press.
    StopEmulator,
}

/// One row of the binding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    /// Label used in logs.
    pub name: String,
    /// BCM pin number.
    pub pin: u8,
    pub action: ActionSpec,
}

impl BindingSpec {
    pub fn key(name: &str, pin: u8, key: KeyCode) -> Self {
        Self {
            name: name.to_string(),
            pin,
            action: ActionSpec::Key(key),
        }
    }

    pub fn stop_emulator(name: &str, pin: u8) -> Self {
        Self {
            name: name.to_string(),
            pin,
            action: ActionSpec::StopEmulator,
        }
    }
}

/// The eleven-button handheld layout: d-pad, A/B, L/R, start, select, reset.
pub fn reference_table() -> Vec<BindingSpec> {
    vec![
        BindingSpec::key("up", 13, KeyCode::Up),
        BindingSpec::key("down", 22, KeyCode::Down),
        BindingSpec::key("left", 5, KeyCode::Left),
        BindingSpec::key("right", 6, KeyCode::Right),
        BindingSpec::key("a", 12, KeyCode::X),
        BindingSpec::key("b", 23, KeyCode::Z),
        BindingSpec::key("l", 20, KeyCode::A),
        BindingSpec::key("r", 26, KeyCode::S),
        BindingSpec::key("start", 27, KeyCode::Enter),
        BindingSpec::key("select", 4, KeyCode::Backspace),
        BindingSpec::stop_emulator("reset", 16),
    ]
}

/// Checks that a table is non-empty and has no duplicate pins or names.
///
/// # Errors
///
/// Returns [`StartupError::InvalidTable`] describing the first problem found.
pub fn validate_table(table: &[BindingSpec]) -> Result<(), StartupError> {
    if table.is_empty() {
        return Err(StartupError::InvalidTable("no buttons configured".into()));
    }
    let mut pins = HashSet::new();
    let mut names = HashSet::new();
    for spec in table {
        if spec.name.trim().is_empty() {
            return Err(StartupError::InvalidTable(format!(
                "button on pin {} has an empty name",
                spec.pin
            )));
        }
        if !pins.insert(spec.pin) {
            return Err(StartupError::InvalidTable(format!(
                "pin {} is bound more than once",
                spec.pin
            )));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(StartupError::InvalidTable(format!(
                "button name {:?} is used more than once",
                spec.name
            )));
        }
    }
    Ok(())
}

/// Every key code a table can emit; this is the capability set registered
/// with the virtual keyboard.
pub fn key_codes(table: &[BindingSpec]) -> BTreeSet<KeyCode> {
    table
        .iter()
        .filter_map(|spec| match spec.action {
            ActionSpec::Key(key) => Some(key),
            ActionSpec::StopEmulator => None,
        })
        .collect()
}

// ── Errors and reports ────────────────────────────────────────────────────────

/// Fatal errors while building the manager.  No retry is attempted: hardware
/// availability is assumed static for the life of the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("virtual keyboard: {0}")]
    Device(#[from] DeviceError),

    #[error("{0}")]
    Controller(#[source] LineError),

    #[error("button {button:?}: {source}")]
    Pin {
        button: String,
        #[source]
        source: LineError,
    },

    #[error("invalid binding table: {0}")]
    InvalidTable(String),
}

/// What happened during one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub presses: usize,
    pub releases: usize,
    pub failures: usize,
    /// Failures identical to the same binding's failure on the previous tick.
    /// These are logged at debug level only.
    pub repeated_failures: usize,
}

// ── KeyManager ────────────────────────────────────────────────────────────────

/// Polls a fixed set of buttons and forwards their edges.
pub struct KeyManager<E: KeyEmitter> {
    emitter: E,
    bindings: Vec<ButtonBinding>,
    /// Last error message per binding, cleared when the binding recovers.
    last_errors: Vec<Option<String>>,
    poll_interval: Duration,
    shut_down: bool,
}

impl<E: KeyEmitter> KeyManager<E> {
    /// Assembles a manager from already-open parts.
    pub fn new(emitter: E, bindings: Vec<ButtonBinding>, poll_interval: Duration) -> Self {
        Self {
            emitter,
            last_errors: vec![None; bindings.len()],
            bindings,
            poll_interval,
            shut_down: false,
        }
    }

    /// Builds the manager from a binding table.
    ///
    /// `open_emitter` receives the full set of key codes used by the table and
    /// must return a ready virtual keyboard.  `stop` is bound to every
    /// [`ActionSpec::StopEmulator`] row.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if the table is invalid, the keyboard cannot be
    /// created, or any pin cannot be opened.  A keyboard created before a pin
    /// failure is torn down when the partially built state is dropped.
    pub fn open<F>(
        table: &[BindingSpec],
        lines: &dyn LineProvider,
        stop: ButtonCallback,
        poll_interval: Duration,
        open_emitter: F,
    ) -> Result<Self, StartupError>
    where
        F: FnOnce(&BTreeSet<KeyCode>) -> Result<E, DeviceError>,
    {
        validate_table(table)?;

        let keys = key_codes(table);
        let mut emitter = open_emitter(&keys)?;

        let mut bindings = Vec::with_capacity(table.len());
        for spec in table {
            let line = match lines.open_input_pull_up(spec.pin) {
                Ok(line) => line,
                Err(source) => {
                    emitter.release();
                    return Err(StartupError::Pin {
                        button: spec.name.clone(),
                        source,
                    });
                }
            };
            let action = match spec.action {
                ActionSpec::Key(key) => BindingAction::KeyEmission(key),
                ActionSpec::StopEmulator => BindingAction::Callback(Arc::clone(&stop)),
            };
            debug!(button = %spec.name, pin = spec.pin, ?action, "button bound");
            bindings.push(ButtonBinding::new(spec.name.clone(), line, action));
        }

        info!(
            buttons = bindings.len(),
            keys = keys.len(),
            "button table opened"
        );
        Ok(Self::new(emitter, bindings, poll_interval))
    }

    pub fn bindings(&self) -> &[ButtonBinding] {
        &self.bindings
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Checks every binding once, in table order.
    ///
    /// A binding that fails is counted and the remaining bindings are still
    /// checked.  A failure is logged at warn level when it first appears or
    /// changes, at debug level while it repeats unchanged.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for (binding, last_error) in self.bindings.iter_mut().zip(&mut self.last_errors) {
            let result = binding.check(&mut self.emitter);
            if result.is_ok() && last_error.take().is_some() {
                info!(button = binding.name(), pin = binding.pin(), "button recovered");
            }
            match result {
                Ok(Some(Edge::Pressed)) => {
                    report.presses += 1;
                    debug!(button = binding.name(), "pressed");
                }
                Ok(Some(Edge::Released)) => {
                    report.releases += 1;
                    debug!(button = binding.name(), "released");
                }
                Ok(None) => {}
                Err(e) => {
                    report.failures += 1;
                    let message = e.to_string();
                    if last_error.as_deref() == Some(message.as_str()) {
                        report.repeated_failures += 1;
                        debug!(button = binding.name(), pin = binding.pin(), "poll error persists: {message}");
                    } else {
                        warn!(button = binding.name(), pin = binding.pin(), "poll error: {message}");
                        *last_error = Some(message);
                    }
                }
            }
        }
        report
    }

    /// Ticks until `running` is cleared, sleeping `poll_interval` between
    /// ticks.  Returns the number of completed ticks.
    pub async fn run(&mut self, running: Arc<AtomicBool>) -> u64 {
        info!(
            buttons = self.bindings.len(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "button polling started"
        );

        let mut ticks = 0u64;
        while running.load(Ordering::Relaxed) {
            self.tick();
            ticks += 1;
            time::sleep(self.poll_interval).await;
        }

        info!(ticks, "button polling stopped");
        ticks
    }

    /// Destroys the virtual keyboard and releases every line.  Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.emitter.release();
        self.bindings.clear();
        self.last_errors.clear();
        info!("button bridge shut down");
    }
}

impl<E: KeyEmitter> Drop for KeyManager<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gpio_line::{InputLine, Level};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // ── Fakes ─────────────────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Emitted {
        Down(KeyCode),
        Up(KeyCode),
    }

    #[derive(Default)]
    struct RecordingEmitter {
        events: Vec<Emitted>,
        released: usize,
        fail_keys: Vec<KeyCode>,
    }

    impl KeyEmitter for RecordingEmitter {
        fn key_down(&mut self, key: KeyCode) -> Result<(), DeviceError> {
            if self.fail_keys.contains(&key) {
                return Err(DeviceError::NotInitialized);
            }
            self.events.push(Emitted::Down(key));
            Ok(())
        }

        fn key_up(&mut self, key: KeyCode) -> Result<(), DeviceError> {
            if self.fail_keys.contains(&key) {
                return Err(DeviceError::NotInitialized);
            }
            self.events.push(Emitted::Up(key));
            Ok(())
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    /// A line whose level is set by the test and whose reads are counted.
    #[derive(Clone)]
    struct SharedLine {
        pin: u8,
        level: Arc<Mutex<Level>>,
        fault: Arc<Mutex<Option<String>>>,
        reads: Arc<AtomicUsize>,
    }

    impl SharedLine {
        fn new(pin: u8) -> Self {
            Self {
                pin,
                level: Arc::new(Mutex::new(Level::High)),
                fault: Arc::new(Mutex::new(None)),
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn set(&self, level: Level) {
            *self.level.lock().unwrap() = level;
        }

        /// Makes every read fail with `reason` until cleared with `None`.
        fn set_fault(&self, reason: Option<&str>) {
            *self.fault.lock().unwrap() = reason.map(str::to_string);
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl InputLine for SharedLine {
        fn pin(&self) -> u8 {
            self.pin
        }

        fn read(&mut self) -> Result<Level, LineError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = self.fault.lock().unwrap().clone() {
                return Err(LineError::Read {
                    pin: self.pin,
                    reason,
                });
            }
            Ok(*self.level.lock().unwrap())
        }
    }

    #[derive(Default)]
    struct FakeLines {
        lines: Mutex<HashMap<u8, SharedLine>>,
        broken: Vec<u8>,
    }

    impl FakeLines {
        fn line(&self, pin: u8) -> SharedLine {
            self.lines
                .lock()
                .unwrap()
                .entry(pin)
                .or_insert_with(|| SharedLine::new(pin))
                .clone()
        }
    }

    impl LineProvider for FakeLines {
        fn open_input_pull_up(&self, pin: u8) -> Result<Box<dyn InputLine>, LineError> {
            if self.broken.contains(&pin) {
                return Err(LineError::PinUnavailable {
                    pin,
                    reason: "claimed".into(),
                });
            }
            Ok(Box::new(self.line(pin)))
        }
    }

    fn noop_stop() -> ButtonCallback {
        Arc::new(|| -> anyhow::Result<()> { Ok(()) })
    }

    fn open_reference(lines: &FakeLines) -> KeyManager<RecordingEmitter> {
        KeyManager::open(
            &reference_table(),
            lines,
            noop_stop(),
            Duration::from_millis(1),
            |_| Ok(RecordingEmitter::default()),
        )
        .expect("reference table opens")
    }

    // ── Table ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_reference_table_has_eleven_unique_buttons() {
        let table = reference_table();
        assert_eq!(table.len(), 11);
        validate_table(&table).unwrap();
    }

    #[test]
    fn test_reference_table_key_set_excludes_callback_buttons() {
        let keys = key_codes(&reference_table());
        assert_eq!(keys.len(), 10);
        assert!(keys.contains(&KeyCode::Enter));
        assert!(keys.contains(&KeyCode::Backspace));
    }

    #[test]
    fn test_validate_rejects_duplicate_pin() {
        let table = vec![
            BindingSpec::key("up", 13, KeyCode::Up),
            BindingSpec::key("down", 13, KeyCode::Down),
        ];
        let err = validate_table(&table).unwrap_err();
        assert!(err.to_string().contains("pin 13"));
    }

    #[test]
    fn test_validate_rejects_duplicate_name_and_empty_table() {
        let table = vec![
            BindingSpec::key("up", 13, KeyCode::Up),
            BindingSpec::key("up", 14, KeyCode::Down),
        ];
        assert!(matches!(
            validate_table(&table),
            Err(StartupError::InvalidTable(_))
        ));
        assert!(matches!(
            validate_table(&[]),
            Err(StartupError::InvalidTable(_))
        ));
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn test_open_passes_full_key_set_to_emitter() {
        // Arrange
        let lines = FakeLines::default();
        let mut seen = BTreeSet::new();

        // Act
        let manager = KeyManager::open(
            &reference_table(),
            &lines,
            noop_stop(),
            DEFAULT_POLL_INTERVAL,
            |keys| {
                seen = keys.clone();
                Ok(RecordingEmitter::default())
            },
        )
        .unwrap();

        // Assert
        assert_eq!(seen, key_codes(&reference_table()));
        assert_eq!(manager.bindings().len(), 11);
        assert_eq!(manager.bindings()[0].name(), "up");
        assert_eq!(manager.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_open_fails_when_emitter_unavailable() {
        let lines = FakeLines::default();
        let result = KeyManager::<RecordingEmitter>::open(
            &reference_table(),
            &lines,
            noop_stop(),
            DEFAULT_POLL_INTERVAL,
            |_| {
                Err(DeviceError::Unavailable {
                    context: "open /dev/uinput".into(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                })
            },
        );
        assert!(matches!(result, Err(StartupError::Device(_))));
    }

    #[test]
    fn test_open_fails_on_unavailable_pin_and_names_the_button() {
        let lines = FakeLines {
            broken: vec![16],
            ..Default::default()
        };
        let result = KeyManager::<RecordingEmitter>::open(
            &reference_table(),
            &lines,
            noop_stop(),
            DEFAULT_POLL_INTERVAL,
            |_| Ok(RecordingEmitter::default()),
        );
        match result {
            Err(StartupError::Pin { button, source }) => {
                assert_eq!(button, "reset");
                assert!(matches!(source, LineError::PinUnavailable { pin: 16, .. }));
            }
            other => panic!("expected pin error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_controller_error_does_not_name_a_pin_or_button() {
        // Arrange
        let error = StartupError::Controller(LineError::ControllerUnavailable {
            reason: "/dev/gpiomem: permission denied".into(),
        });

        // Act
        let message = error.to_string();

        // Assert
        assert_eq!(
            message,
            "GPIO controller unavailable: /dev/gpiomem: permission denied"
        );
        assert!(!message.contains("pin"));
        assert!(!message.contains("button"));
    }

    // ── Ticking ───────────────────────────────────────────────────────────────

    #[test]
    fn test_tick_forwards_press_and_release() {
        // Arrange
        let lines = FakeLines::default();
        let mut manager = open_reference(&lines);
        let start = lines.line(27);

        // Act
        let idle = manager.tick();
        start.set(Level::Low);
        let pressed = manager.tick();
        start.set(Level::High);
        let released = manager.tick();

        // Assert
        assert_eq!(idle, TickReport::default());
        assert_eq!(pressed.presses, 1);
        assert_eq!(released.releases, 1);
        assert_eq!(
            manager.emitter().events,
            vec![Emitted::Down(KeyCode::Enter), Emitted::Up(KeyCode::Enter)]
        );
    }

    #[test]
    fn test_reset_button_invokes_stop_callback() {
        // Arrange
        let lines = FakeLines::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let stop: ButtonCallback = Arc::new(move || -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let mut manager = KeyManager::open(
            &reference_table(),
            &lines,
            stop,
            DEFAULT_POLL_INTERVAL,
            |_| Ok(RecordingEmitter::default()),
        )
        .unwrap();

        // Act
        lines.line(16).set(Level::Low);
        manager.tick();
        manager.tick();

        // Assert
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(manager.emitter().events.is_empty());
    }

    #[test]
    fn test_failing_binding_does_not_stop_later_bindings() {
        // Arrange – "up" (first in table) cannot emit
        let lines = FakeLines::default();
        let mut manager = KeyManager::open(
            &reference_table(),
            &lines,
            noop_stop(),
            DEFAULT_POLL_INTERVAL,
            |_| {
                Ok(RecordingEmitter {
                    fail_keys: vec![KeyCode::Up],
                    ..Default::default()
                })
            },
        )
        .unwrap();
        lines.line(13).set(Level::Low);
        lines.line(4).set(Level::Low);

        // Act
        let report = manager.tick();

        // Assert
        assert_eq!(report.failures, 1);
        assert_eq!(report.presses, 1);
        assert_eq!(manager.emitter().events, vec![Emitted::Down(KeyCode::Backspace)]);
        assert!(manager.bindings()[0].is_pressed(), "failed binding still advanced");
        for pin in [13, 22, 5, 6, 12, 23, 20, 26, 27, 4, 16] {
            assert_eq!(lines.line(pin).reads(), 1, "pin {pin} checked once");
        }
    }

    #[test]
    fn test_persistent_failure_is_counted_as_repeat_until_it_changes() {
        // Arrange
        let lines = FakeLines::default();
        let mut manager = open_reference(&lines);
        let select = lines.line(4);
        select.set_fault(Some("bus error"));

        // Act
        let first = manager.tick();
        let second = manager.tick();
        let third = manager.tick();
        select.set_fault(Some("line released"));
        let changed = manager.tick();

        // Assert
        assert_eq!((first.failures, first.repeated_failures), (1, 0));
        assert_eq!((second.failures, second.repeated_failures), (1, 1));
        assert_eq!((third.failures, third.repeated_failures), (1, 1));
        assert_eq!((changed.failures, changed.repeated_failures), (1, 0));
    }

    #[test]
    fn test_recovered_binding_reports_next_failure_as_new() {
        // Arrange
        let lines = FakeLines::default();
        let mut manager = open_reference(&lines);
        let select = lines.line(4);
        select.set_fault(Some("bus error"));
        manager.tick();

        // Act
        select.set_fault(None);
        let recovered = manager.tick();
        select.set_fault(Some("bus error"));
        let again = manager.tick();

        // Assert
        assert_eq!(recovered, TickReport::default());
        assert_eq!((again.failures, again.repeated_failures), (1, 0));
    }

    // ── Run loop ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_run_returns_immediately_when_not_running() {
        let lines = FakeLines::default();
        let mut manager = open_reference(&lines);
        let ticks = manager.run(Arc::new(AtomicBool::new(false))).await;
        assert_eq!(ticks, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_tick_completes_that_tick() {
        // Arrange – the reset callback, first in table order, clears the flag
        let lines = FakeLines::default();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let stop: ButtonCallback = Arc::new(move || -> anyhow::Result<()> {
            flag.store(false, Ordering::Relaxed);
            Ok(())
        });
        let table = vec![
            BindingSpec::stop_emulator("reset", 16),
            BindingSpec::key("up", 13, KeyCode::Up),
            BindingSpec::key("start", 27, KeyCode::Enter),
        ];
        let mut manager = KeyManager::open(
            &table,
            &lines,
            stop,
            Duration::from_millis(1),
            |_| Ok(RecordingEmitter::default()),
        )
        .unwrap();
        lines.line(16).set(Level::Low);
        lines.line(27).set(Level::Low);

        // Act
        let ticks = manager.run(Arc::clone(&running)).await;

        // Assert – the bindings after the cancelling one were still checked
        assert_eq!(ticks, 1);
        assert_eq!(lines.line(13).reads(), 1);
        assert_eq!(lines.line(27).reads(), 1);
        assert_eq!(manager.emitter().events, vec![Emitted::Down(KeyCode::Enter)]);
    }

    #[tokio::test]
    async fn test_run_stops_after_flag_cleared_from_another_task() {
        // Arrange
        let lines = FakeLines::default();
        let mut manager = open_reference(&lines);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        // Act
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(20)).await;
            flag.store(false, Ordering::Relaxed);
        });
        let ticks = manager.run(running).await;

        // Assert – every binding was read once per completed tick
        assert!(ticks >= 1);
        assert_eq!(lines.line(13).reads() as u64, ticks);
        assert_eq!(lines.line(16).reads() as u64, ticks);
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    #[test]
    fn test_shutdown_is_idempotent_and_releases_lines() {
        let lines = FakeLines::default();
        let mut manager = open_reference(&lines);

        manager.shutdown();
        manager.shutdown();

        assert_eq!(manager.emitter().released, 1);
        assert!(manager.bindings().is_empty());
        assert_eq!(manager.tick(), TickReport::default());
    }
}
