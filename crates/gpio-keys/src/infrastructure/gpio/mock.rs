//! Scripted GPIO lines for tests.
//!
//! Each pin is driven by a [`LineScript`]: a queue of samples consumed one per
//! read.  Once the queue is empty the line keeps reporting the last level it
//! returned (initially [`Level::High`], i.e. released), so a script only needs
//! to describe the interesting part of a test.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::application::gpio_line::{InputLine, Level, LineError, LineProvider};

#[derive(Debug)]
enum Sample {
    Level(Level),
    Fault,
}

#[derive(Debug)]
struct ScriptState {
    queue: VecDeque<Sample>,
    idle: Level,
    reads: usize,
}

/// Shared handle on one pin's sample queue.
#[derive(Debug, Clone)]
pub struct LineScript(Arc<Mutex<ScriptState>>);

impl Default for LineScript {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(ScriptState {
            queue: VecDeque::new(),
            idle: Level::High,
            reads: 0,
        })))
    }
}

impl LineScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `levels`, one per future read.
    pub fn push(&self, levels: &[Level]) -> &Self {
        let mut state = self.0.lock().unwrap();
        state
            .queue
            .extend(levels.iter().copied().map(Sample::Level));
        self
    }

    /// Queues one failing read.
    pub fn push_fault(&self) -> &Self {
        self.0.lock().unwrap().queue.push_back(Sample::Fault);
        self
    }

    /// How many reads this pin has served, failed ones included.
    pub fn reads(&self) -> usize {
        self.0.lock().unwrap().reads
    }

    fn next(&self, pin: u8) -> Result<Level, LineError> {
        let mut state = self.0.lock().unwrap();
        state.reads += 1;
        match state.queue.pop_front() {
            Some(Sample::Level(level)) => {
                state.idle = level;
                Ok(level)
            }
            Some(Sample::Fault) => Err(LineError::Read {
                pin,
                reason: "injected read fault".to_string(),
            }),
            None => Ok(state.idle),
        }
    }
}

/// An [`InputLine`] fed from a [`LineScript`].
#[derive(Debug)]
pub struct ScriptedLine {
    pin: u8,
    script: LineScript,
}

impl ScriptedLine {
    pub fn new(pin: u8, script: LineScript) -> Self {
        Self { pin, script }
    }
}

impl InputLine for ScriptedLine {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn read(&mut self) -> Result<Level, LineError> {
        self.script.next(self.pin)
    }
}

/// A [`LineProvider`] that hands out [`ScriptedLine`]s.
///
/// Pins without an explicit script get an idle one on first open.  A pin may
/// be opened only once.
#[derive(Debug, Default)]
pub struct MockLineProvider {
    scripts: Mutex<HashMap<u8, LineScript>>,
    unavailable: HashSet<u8>,
    claimed: Mutex<HashSet<u8>>,
}

impl MockLineProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `pin` fail to open.
    pub fn with_unavailable(mut self, pin: u8) -> Self {
        self.unavailable.insert(pin);
        self
    }

    /// The script driving `pin`, created if it does not exist yet.
    pub fn script(&self, pin: u8) -> LineScript {
        self.scripts
            .lock()
            .unwrap()
            .entry(pin)
            .or_default()
            .clone()
    }

    /// Pins opened so far.
    pub fn claimed(&self) -> HashSet<u8> {
        self.claimed.lock().unwrap().clone()
    }
}

impl LineProvider for MockLineProvider {
    fn open_input_pull_up(&self, pin: u8) -> Result<Box<dyn InputLine>, LineError> {
        if self.unavailable.contains(&pin) {
            return Err(LineError::PinUnavailable {
                pin,
                reason: "pin unavailable".to_string(),
            });
        }
        if !self.claimed.lock().unwrap().insert(pin) {
            return Err(LineError::PinUnavailable {
                pin,
                reason: "pin already claimed".to_string(),
            });
        }
        Ok(Box::new(ScriptedLine::new(pin, self.script(pin))))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_replays_then_holds_last_level() {
        let provider = MockLineProvider::new();
        provider.script(5).push(&[Level::High, Level::Low]);
        let mut line = provider.open_input_pull_up(5).unwrap();

        let samples: Vec<Level> = (0..4).map(|_| line.read().unwrap()).collect();

        assert_eq!(samples, vec![Level::High, Level::Low, Level::Low, Level::Low]);
        assert_eq!(provider.script(5).reads(), 4);
    }

    #[test]
    fn test_fault_fails_one_read_only() {
        let provider = MockLineProvider::new();
        provider.script(6).push_fault();
        let mut line = provider.open_input_pull_up(6).unwrap();

        assert!(matches!(line.read(), Err(LineError::Read { pin: 6, .. })));
        assert_eq!(line.read().unwrap(), Level::High);
    }

    #[test]
    fn test_second_claim_of_a_pin_fails() {
        let provider = MockLineProvider::new();
        let _first = provider.open_input_pull_up(13).unwrap();

        let second = provider.open_input_pull_up(13);

        assert!(matches!(second, Err(LineError::PinUnavailable { pin: 13, .. })));
    }

    #[test]
    fn test_unavailable_pin_fails_to_open() {
        let provider = MockLineProvider::new().with_unavailable(99);

        assert!(provider.open_input_pull_up(99).is_err());
        assert!(provider.claimed().is_empty());
    }
}
