//! Recording [`UinputNode`] for tests.
//!
//! Every call is appended to a shared [`NodeLog`] that stays readable after
//! the node has been moved into a [`VirtualInputDevice`](super::VirtualInputDevice)
//! and dropped.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gpio_keys_core::protocol::{DESCRIPTOR_SIZE, INPUT_EVENT_SIZE};
use gpio_keys_core::{DeviceDescriptor, InputEvent};

use super::UinputNode;

/// One recorded node operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCall {
    SetEventBit(u16),
    SetKeyBit(u16),
    Write(Vec<u8>),
    Create,
    Destroy,
    /// The node was dropped.
    Close,
}

/// Shared view of everything a [`RecordingUinputNode`] was asked to do.
#[derive(Debug, Clone, Default)]
pub struct NodeLog(Arc<Mutex<Vec<NodeCall>>>);

impl NodeLog {
    pub fn calls(&self) -> Vec<NodeCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &NodeCall) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Every event-sized write, decoded, in order.
    pub fn events(&self) -> Vec<InputEvent> {
        self.writes()
            .into_iter()
            .filter(|bytes| bytes.len() == INPUT_EVENT_SIZE)
            .filter_map(|bytes| InputEvent::decode(&bytes).ok())
            .collect()
    }

    /// The descriptor-sized write, decoded, if one was made.
    pub fn descriptor(&self) -> Option<DeviceDescriptor> {
        self.writes()
            .into_iter()
            .find(|bytes| bytes.len() == DESCRIPTOR_SIZE)
            .and_then(|bytes| DeviceDescriptor::decode(&bytes).ok())
    }

    /// Index of the first occurrence of `call`.
    pub fn position(&self, call: &NodeCall) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|c| c == call)
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                NodeCall::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: NodeCall) {
        self.0.lock().unwrap().push(call);
    }
}

/// A [`UinputNode`] that records calls and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingUinputNode {
    log: NodeLog,
    fail_create: bool,
    fail_destroy: bool,
    fail_key_bit: Option<u16>,
    write_fault: Arc<AtomicBool>,
}

impl RecordingUinputNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn with_failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    pub fn with_failing_key_bit(mut self, code: u16) -> Self {
        self.fail_key_bit = Some(code);
        self
    }

    pub fn log(&self) -> NodeLog {
        self.log.clone()
    }

    /// While set, every write fails with `EIO`-like errors.
    pub fn write_fault(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.write_fault)
    }
}

impl UinputNode for RecordingUinputNode {
    fn set_event_bit(&mut self, event_type: u16) -> io::Result<()> {
        self.log.push(NodeCall::SetEventBit(event_type));
        Ok(())
    }

    fn set_key_bit(&mut self, code: u16) -> io::Result<()> {
        self.log.push(NodeCall::SetKeyBit(code));
        if self.fail_key_bit == Some(code) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "key bit rejected"));
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.write_fault.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write fault"));
        }
        self.log.push(NodeCall::Write(bytes.to_vec()));
        Ok(())
    }

    fn create(&mut self) -> io::Result<()> {
        self.log.push(NodeCall::Create);
        if self.fail_create {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "create rejected"));
        }
        Ok(())
    }

    fn destroy(&mut self) -> io::Result<()> {
        self.log.push(NodeCall::Destroy);
        if self.fail_destroy {
            return Err(io::Error::new(io::ErrorKind::Other, "destroy rejected"));
        }
        Ok(())
    }
}

impl Drop for RecordingUinputNode {
    fn drop(&mut self) {
        self.log.push(NodeCall::Close);
    }
}
