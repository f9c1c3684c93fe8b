//! Byte-exact encoding of `struct input_event` and `struct uinput_user_dev`.
//!
//! Both structures are written in the target's native byte order with the
//! native C layout:
//!
//! ```text
//! input_event      [tv_sec:long][tv_usec:long][type:u16][code:u16][value:i32]
//! uinput_user_dev  [name:80][bustype:u16][vendor:u16][product:u16][version:u16]
//!                  [ff_effects_max:i32][absmax:i32×64][absmin:i32×64]
//!                  [absfuzz:i32×64][absflat:i32×64]
//! ```
//!
//! Neither layout contains implicit padding: the timestamp is long-aligned and
//! everything after it is naturally aligned.  The timestamp is always written
//! as zero; the kernel stamps events itself.

use thiserror::Error;

use super::{
    ABS_CNT, BUS_USB, DESCRIPTOR_SIZE, EV_KEY, EV_SYN, INPUT_EVENT_SIZE, KEY_PRESSED,
    KEY_RELEASED, SYN_REPORT, TIMESTAMP_SIZE, UINPUT_MAX_NAME_SIZE,
};

/// Errors produced while encoding or decoding uinput structures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The byte slice is shorter than the structure being decoded.
    #[error("insufficient data: need {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The device name is empty.
    #[error("device name must not be empty")]
    EmptyName,

    /// The device name does not fit in the 80-byte field with its terminator.
    #[error("device name is {len} bytes; at most {max} fit in uinput_user_dev", max = UINPUT_MAX_NAME_SIZE - 1)]
    NameTooLong { len: usize },

    /// The device name contains an interior NUL byte.
    #[error("device name contains a NUL byte")]
    NameContainsNul,
}

// ── input_event ───────────────────────────────────────────────────────────────

/// One `struct input_event` record without its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    /// An `EV_KEY` record: value 1 for a press, 0 for a release.
    pub fn key(code: u16, pressed: bool) -> Self {
        Self {
            event_type: EV_KEY,
            code,
            value: if pressed { KEY_PRESSED } else { KEY_RELEASED },
        }
    }

    /// The `EV_SYN`/`SYN_REPORT` record that closes a group of events.
    pub fn sync() -> Self {
        Self {
            event_type: EV_SYN,
            code: SYN_REPORT,
            value: 0,
        }
    }

    /// Encodes the record with a zeroed timestamp.
    pub fn encode(&self) -> [u8; INPUT_EVENT_SIZE] {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        let mut at = TIMESTAMP_SIZE;
        put(&mut buf, &mut at, &self.event_type.to_ne_bytes());
        put(&mut buf, &mut at, &self.code.to_ne_bytes());
        put(&mut buf, &mut at, &self.value.to_ne_bytes());
        debug_assert_eq!(at, INPUT_EVENT_SIZE);
        buf
    }

    /// Decodes one record from the start of `bytes`, ignoring the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InsufficientData`] if fewer than
    /// [`INPUT_EVENT_SIZE`] bytes are available.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        require(bytes, INPUT_EVENT_SIZE)?;
        let mut at = TIMESTAMP_SIZE;
        let event_type = u16::from_ne_bytes(take(bytes, &mut at));
        let code = u16::from_ne_bytes(take(bytes, &mut at));
        let value = i32::from_ne_bytes(take(bytes, &mut at));
        Ok(Self {
            event_type,
            code,
            value,
        })
    }
}

// ── uinput_user_dev ───────────────────────────────────────────────────────────

/// The one-time `struct uinput_user_dev` written before `UI_DEV_CREATE`.
///
/// The absolute-axis arrays are not represented: this is a digital keyboard
/// and they are always encoded as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub bus_type: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
}

impl DeviceDescriptor {
    /// A USB-bus descriptor with the given identity.
    pub fn usb(name: impl Into<String>, vendor_id: u16, product_id: u16, version: u16) -> Self {
        Self {
            name: name.into(),
            bus_type: BUS_USB,
            vendor_id,
            product_id,
            version,
        }
    }

    /// Checks that the name fits the fixed 80-byte, NUL-terminated field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyName`], [`CodecError::NameContainsNul`] or
    /// [`CodecError::NameTooLong`].
    pub fn validate(&self) -> Result<(), CodecError> {
        let len = self.name.len();
        if len == 0 {
            return Err(CodecError::EmptyName);
        }
        if self.name.as_bytes().contains(&0) {
            return Err(CodecError::NameContainsNul);
        }
        if len >= UINPUT_MAX_NAME_SIZE {
            return Err(CodecError::NameTooLong { len });
        }
        Ok(())
    }

    /// Encodes the full 1116-byte structure.
    ///
    /// # Errors
    ///
    /// Returns the [`validate`](Self::validate) error if the name does not fit.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        self.validate()?;

        let mut buf = vec![0u8; DESCRIPTOR_SIZE];
        buf[..self.name.len()].copy_from_slice(self.name.as_bytes());

        let mut at = UINPUT_MAX_NAME_SIZE;
        put(&mut buf, &mut at, &self.bus_type.to_ne_bytes());
        put(&mut buf, &mut at, &self.vendor_id.to_ne_bytes());
        put(&mut buf, &mut at, &self.product_id.to_ne_bytes());
        put(&mut buf, &mut at, &self.version.to_ne_bytes());
        // ff_effects_max
        put(&mut buf, &mut at, &0i32.to_ne_bytes());
        // absmax, absmin, absfuzz, absflat stay zero
        at += 4 * ABS_CNT * 4;
        debug_assert_eq!(at, DESCRIPTOR_SIZE);
        Ok(buf)
    }

    /// Decodes the identity fields of an encoded descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InsufficientData`] if `bytes` is shorter than
    /// [`DESCRIPTOR_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        require(bytes, DESCRIPTOR_SIZE)?;
        let name_field = &bytes[..UINPUT_MAX_NAME_SIZE];
        let name_len = name_field
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(UINPUT_MAX_NAME_SIZE);
        let name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();

        let mut at = UINPUT_MAX_NAME_SIZE;
        Ok(Self {
            name,
            bus_type: u16::from_ne_bytes(take(bytes, &mut at)),
            vendor_id: u16::from_ne_bytes(take(bytes, &mut at)),
            product_id: u16::from_ne_bytes(take(bytes, &mut at)),
            version: u16::from_ne_bytes(take(bytes, &mut at)),
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn put(buf: &mut [u8], at: &mut usize, bytes: &[u8]) {
    buf[*at..*at + bytes.len()].copy_from_slice(bytes);
    *at += bytes.len();
}

fn take<const N: usize>(bytes: &[u8], at: &mut usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[*at..*at + N]);
    *at += N;
    out
}

fn require(bytes: &[u8], needed: usize) -> Result<(), CodecError> {
    if bytes.len() < needed {
        return Err(CodecError::InsufficientData {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_record_layout() {
        // Arrange
        let event = InputEvent::key(28, true);

        // Act
        let bytes = event.encode();

        // Assert – timestamp zeroed, then type, code, value in native order
        assert!(bytes[..TIMESTAMP_SIZE].iter().all(|b| *b == 0));
        assert_eq!(&bytes[TIMESTAMP_SIZE..TIMESTAMP_SIZE + 2], &EV_KEY.to_ne_bytes());
        assert_eq!(&bytes[TIMESTAMP_SIZE + 2..TIMESTAMP_SIZE + 4], &28u16.to_ne_bytes());
        assert_eq!(&bytes[TIMESTAMP_SIZE + 4..], &1i32.to_ne_bytes());
    }

    #[test]
    fn test_key_up_record_has_value_zero() {
        let event = InputEvent::key(103, false);
        assert_eq!(event.value, KEY_RELEASED);
        assert_eq!(InputEvent::decode(&event.encode()), Ok(event));
    }

    #[test]
    fn test_sync_record_is_syn_report_zero() {
        let bytes = InputEvent::sync().encode();
        assert!(bytes.iter().all(|b| *b == 0), "EV_SYN/SYN_REPORT/0 encodes as all zeros");
    }

    #[test]
    fn test_decode_ignores_timestamp() {
        let mut bytes = InputEvent::key(30, true).encode();
        bytes[0] = 0xAB;
        assert_eq!(InputEvent::decode(&bytes), Ok(InputEvent::key(30, true)));
    }

    #[test]
    fn test_decode_short_input_returns_error() {
        let result = InputEvent::decode(&[0u8; 4]);
        assert_eq!(
            result,
            Err(CodecError::InsufficientData {
                needed: INPUT_EVENT_SIZE,
                available: 4
            })
        );
    }

    #[test]
    fn test_descriptor_layout() {
        // Arrange
        let descriptor = DeviceDescriptor::usb("pad", 0x1234, 0x5678, 1);

        // Act
        let bytes = descriptor.encode().unwrap();

        // Assert
        assert_eq!(bytes.len(), DESCRIPTOR_SIZE);
        assert_eq!(&bytes[..3], b"pad");
        assert!(bytes[3..UINPUT_MAX_NAME_SIZE].iter().all(|b| *b == 0));
        assert_eq!(&bytes[80..82], &BUS_USB.to_ne_bytes());
        assert_eq!(&bytes[82..84], &0x1234u16.to_ne_bytes());
        assert_eq!(&bytes[84..86], &0x5678u16.to_ne_bytes());
        assert_eq!(&bytes[86..88], &1u16.to_ne_bytes());
        // ff_effects_max and every abs array entry are zero
        assert!(bytes[88..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_descriptor_decode_recovers_identity() {
        let descriptor = DeviceDescriptor::usb("gba-loader-input-controller", 1, 2, 3);
        let bytes = descriptor.encode().unwrap();
        assert_eq!(DeviceDescriptor::decode(&bytes), Ok(descriptor));
    }

    #[test]
    fn test_descriptor_name_of_79_bytes_fits() {
        let descriptor = DeviceDescriptor::usb("n".repeat(79), 0, 0, 0);
        let bytes = descriptor.encode().unwrap();
        assert_eq!(bytes[79], 0, "terminator must survive");
    }

    #[test]
    fn test_descriptor_rejects_bad_names() {
        assert_eq!(
            DeviceDescriptor::usb("n".repeat(80), 0, 0, 0).encode(),
            Err(CodecError::NameTooLong { len: 80 })
        );
        assert_eq!(
            DeviceDescriptor::usb("", 0, 0, 0).encode(),
            Err(CodecError::EmptyName)
        );
        assert_eq!(
            DeviceDescriptor::usb("a\0b", 0, 0, 0).encode(),
            Err(CodecError::NameContainsNul)
        );
    }
}
