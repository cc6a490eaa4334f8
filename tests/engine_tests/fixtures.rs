//! Arduino Uno R3 fixtures and test helpers

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use firmata::protocol::{Frame, FrameReader};
use firmata::transport::{DeviceEnd, MemoryTransport};
use firmata::{Config, Firmata, FirmataError, Hooks, PinName, Session};
use parking_lot::Mutex;

// =============================================================================
// Wire Fixtures
// =============================================================================

pub const PROTOCOL_VERSION: &[u8] = &[249, 2, 3];

/// Firmware 2.3 "StandardFirmata.ino"
pub const FIRMWARE: &[u8] = &[
    240, 121, 2, 3, 83, 0, 116, 0, 97, 0, 110, 0, 100, 0, 97, 0, 114, 0, 100, 0, 70, 0, 105, 0,
    114, 0, 109, 0, 97, 0, 116, 0, 97, 0, 46, 0, 105, 0, 110, 0, 111, 0, 247,
];

/// 20 pins: D0/D1 without modes, D2-D13 digital (PWM on 3, 5, 6, 9, 10, 11),
/// D14-D19 analog (I2C on 18, 19)
pub const CAPABILITIES: &[u8] = &[
    240, 108, 127, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 4, 14,
    127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1,
    1, 1, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 3, 8,
    4, 14, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1, 1, 1, 2, 10, 127, 0, 1, 1, 1,
    2, 10, 127, 0, 1, 1, 1, 2, 10, 127, 0, 1, 1, 1, 2, 10, 127, 0, 1, 1, 1, 2, 10, 6, 1, 127, 0, 1,
    1, 1, 2, 10, 6, 1, 127, 247,
];

pub const ANALOG_MAPPING: &[u8] = &[
    240, 106, 127, 127, 127, 127, 127, 127, 127, 127, 127, 127, 127, 127, 127, 127, 0, 1, 2, 3, 4,
    5, 247,
];

pub const TOTAL_PINS: u8 = 20;

/// Pin names of D0..D19
pub const PIN_NAMES: [&str; 20] = [
    "PB9", "PB8", "PB7", "PB6", "PB5", "PB4", "PB3", "PA15", "PA12", "PA11", "PA10", "PA9", "PA8",
    "PB15", "PB14", "PB13", "PB12", "PC13", "PC14", "PC15",
];

/// Pin state replies: D0/D1 ignored, D2 input, D3-D13 output, D14-D19 analog
pub fn pin_states() -> Vec<u8> {
    let mut bytes = Vec::new();
    for pin in 0..TOTAL_PINS {
        let (mode, state) = match pin {
            0 | 1 => (0x7F, 0),
            2 => (0x00, 1),
            3..=13 => (0x01, 1),
            _ => (0x02, 1),
        };
        bytes.extend_from_slice(&[240, 110, pin, mode, state, 247]);
    }
    bytes
}

pub fn pin_names_reply() -> Vec<u8> {
    pin_names_reply_for(&PIN_NAMES)
}

pub fn pin_names_reply_for(names: &[&str]) -> Vec<u8> {
    let mut bytes = vec![240, 0x07];
    for name in names {
        let name: PinName = name.parse().unwrap();
        bytes.push(name.0 & 0x7F);
        bytes.push(name.0 >> 7);
    }
    bytes.push(247);
    bytes
}

/// Every handshake reply, in order
pub fn handshake_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(PROTOCOL_VERSION);
    bytes.extend_from_slice(FIRMWARE);
    bytes.extend_from_slice(CAPABILITIES);
    bytes.extend_from_slice(ANALOG_MAPPING);
    bytes.extend_from_slice(&pin_states());
    bytes.extend_from_slice(&pin_names_reply());
    bytes
}

/// Decode every frame in `bytes`
pub fn frames(bytes: &[u8]) -> Vec<Frame> {
    let mut reader = FrameReader::new(Cursor::new(bytes.to_vec()));
    let mut frames = Vec::new();
    loop {
        match reader.read_frame() {
            Ok(frame) => frames.push(frame),
            Err(FirmataError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return frames
            }
            Err(e) => panic!("fixture failed to decode: {}", e),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// A writer whose bytes the test can inspect
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Feed every frame in `bytes` to the session
pub fn feed(session: &mut Session, bytes: &[u8]) -> firmata::Result<()> {
    for frame in frames(bytes) {
        session.process_frame(frame)?;
    }
    Ok(())
}

/// A session that completed the Uno handshake, with its output cleared
pub fn connected_session(hooks: Hooks) -> (Session, SharedBuf) {
    let out = SharedBuf::default();
    let mut session = Session::new(out.clone(), hooks);
    feed(&mut session, &handshake_bytes()).unwrap();
    out.take();
    (session, out)
}

// =============================================================================
// Engine Helpers
// =============================================================================

pub fn test_config() -> Config {
    Config::builder()
        .handshake_timeout(Duration::from_secs(5))
        .build()
}

/// An engine connected over an in-memory pipe to a simulated Uno
pub fn connect_memory(hooks: Hooks) -> (Firmata, DeviceEnd) {
    let (transport, device) = MemoryTransport::pair();
    device.send(&handshake_bytes());
    let firmata = Firmata::connect(transport, test_config(), hooks).unwrap();
    device.take_written();
    (firmata, device)
}
