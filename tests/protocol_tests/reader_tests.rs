//! Reader Tests
//!
//! Frames pulled off a byte stream with `FrameReader`.

use std::io::{Cursor, ErrorKind};

use firmata::protocol::{Frame, FrameReader, I2cReply, MAX_SYSEX_SIZE};
use firmata::{FirmataError, PinMode, PinName};

/// Same capability layout as an Arduino Uno: 20 pins
const UNO_CAPABILITIES: &[u8] = &[
    240, 108, 127, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 4, 14,
    127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1,
    1, 1, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 3, 8, 4, 14, 127, 0, 1, 1, 1, 3, 8,
    4, 14, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1, 1, 1, 4, 14, 127, 0, 1, 1, 1, 2, 10, 127, 0, 1, 1, 1,
    2, 10, 127, 0, 1, 1, 1, 2, 10, 127, 0, 1, 1, 1, 2, 10, 127, 0, 1, 1, 1, 2, 10, 6, 1, 127, 0, 1,
    1, 1, 2, 10, 6, 1, 127, 247,
];

fn reader(bytes: &[u8]) -> FrameReader<Cursor<Vec<u8>>> {
    FrameReader::new(Cursor::new(bytes.to_vec()))
}

fn read_one(bytes: &[u8]) -> firmata::Result<Frame> {
    reader(bytes).read_frame()
}

fn is_eof(result: &firmata::Result<Frame>) -> bool {
    matches!(result, Err(FirmataError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof)
}

// =============================================================================
// Fixed-size Messages
// =============================================================================

#[test]
fn test_read_protocol_version() {
    assert_eq!(
        read_one(&[0xF9, 2, 3]).unwrap(),
        Frame::ProtocolVersion { major: 2, minor: 3 }
    );
}

#[test]
fn test_read_analog_messages() {
    let mut reader = reader(&[0xE0, 0x23, 0x05, 0xE1, 0x23, 0x06]);
    assert_eq!(
        reader.read_frame().unwrap(),
        Frame::Analog { pin: 0, value: 675 }
    );
    assert_eq!(
        reader.read_frame().unwrap(),
        Frame::Analog { pin: 1, value: 803 }
    );
    assert!(is_eof(&reader.read_frame()));
}

#[test]
fn test_read_digital_message_high_bit() {
    // Bit 7 of the port arrives in the second data byte
    assert_eq!(
        read_one(&[0x92, 0x05, 0x01]).unwrap(),
        Frame::Digital {
            port: 2,
            mask: 0b1000_0101
        }
    );
}

#[test]
fn test_unknown_lead_byte() {
    let mut reader = reader(&[0xA5, 0xF9, 2, 3]);
    assert!(matches!(
        reader.read_frame(),
        Err(FirmataError::UnsupportedCommand(0xA5))
    ));
    // Data bytes of the next frame are left untouched
    assert_eq!(
        reader.read_frame().unwrap(),
        Frame::ProtocolVersion { major: 2, minor: 3 }
    );
}

#[test]
fn test_truncated_message() {
    assert!(is_eof(&read_one(&[0xE0, 0x23])));
}

// =============================================================================
// Sysex Messages
// =============================================================================

#[test]
fn test_read_firmware() {
    let frame = read_one(&[240, 121, 2, 3, 83, 0, 116, 0, 247]).unwrap();
    assert_eq!(
        frame,
        Frame::Firmware {
            major: 2,
            minor: 3,
            name: "St".to_string()
        }
    );
}

#[test]
fn test_read_firmware_drops_nul_bytes() {
    let frame = read_one(&[240, 121, 2, 3, 83, 0, 0, 0, 116, 0, 0, 0, 247]).unwrap();
    assert_eq!(
        frame,
        Frame::Firmware {
            major: 2,
            minor: 3,
            name: "St".to_string()
        }
    );
}

#[test]
fn test_read_short_firmware() {
    assert!(matches!(
        read_one(&[240, 121, 2, 247]),
        Err(FirmataError::MalformedFrame(_))
    ));
}

#[test]
fn test_read_uno_capabilities() {
    let Frame::Capabilities(caps) = read_one(UNO_CAPABILITIES).unwrap() else {
        panic!("expected capabilities");
    };

    assert_eq!(caps.total_pins(), 20);
    assert_eq!(caps.total_ports(), 3);
    assert!(caps.pins[0].is_empty());
    assert!(caps.pins[1].is_empty());
    assert_eq!(caps.pins[3].get(&PinMode::PWM), Some(&8));
    assert_eq!(caps.pins[14].get(&PinMode::ANALOG), Some(&10));
    assert_eq!(caps.pins[19].get(&PinMode::I2C), Some(&1));
    assert_eq!(caps.pins[2].len(), 3);
}

#[test]
fn test_read_unterminated_capabilities() {
    assert!(matches!(
        read_one(&[240, 108, 0, 1, 1, 1, 247]),
        Err(FirmataError::MalformedFrame(_))
    ));
    assert!(matches!(
        read_one(&[240, 108, 0, 1, 1, 247]),
        Err(FirmataError::MalformedFrame(_))
    ));
}

#[test]
fn test_read_analog_mapping() {
    assert_eq!(
        read_one(&[240, 106, 127, 127, 0, 1, 247]).unwrap(),
        Frame::AnalogMapping(vec![127, 127, 0, 1])
    );
}

#[test]
fn test_read_pin_state() {
    assert_eq!(
        read_one(&[240, 110, 13, 1, 1, 247]).unwrap(),
        Frame::PinState {
            pin: 13,
            mode: PinMode::OUTPUT,
            state: 1
        }
    );
    // Multi-byte state, 7 bits per byte
    assert_eq!(
        read_one(&[240, 110, 3, 3, 0x7F, 0x01, 247]).unwrap(),
        Frame::PinState {
            pin: 3,
            mode: PinMode::PWM,
            state: 255
        }
    );
}

#[test]
fn test_read_i2c_reply() {
    let frame = read_one(&[240, 119, 0x48, 0, 0x10, 0, 0x7F, 0x01, 0x02, 0x00, 247]).unwrap();
    assert_eq!(
        frame,
        Frame::I2cReply(I2cReply {
            address: 0x48,
            register: 0x10,
            data: vec![0xFF, 0x02],
        })
    );
}

#[test]
fn test_read_short_i2c_reply() {
    assert!(matches!(
        read_one(&[240, 119, 0x48, 0, 247]),
        Err(FirmataError::MalformedFrame(_))
    ));
}

#[test]
fn test_read_pin_names() {
    let frame = read_one(&[240, 0x07, 0x19, 0x00, 0x40, 0x01, 0x7F, 0x01, 247]).unwrap();
    assert_eq!(
        frame,
        Frame::PinNames(vec![
            PinName::gpio('B', 9).unwrap(),
            PinName::V3_3,
            PinName::UNKNOWN
        ])
    );
}

#[test]
fn test_read_string_data() {
    assert_eq!(
        read_one(&[240, 0x71, 0x68, 0, 0x69, 0, 247]).unwrap(),
        Frame::StringData(b"hi".to_vec())
    );
}

#[test]
fn test_read_unknown_sysex() {
    assert_eq!(
        read_one(&[240, 0x42, 1, 2, 247]).unwrap(),
        Frame::Sysex(vec![0x42, 1, 2])
    );
    assert_eq!(read_one(&[240, 247]).unwrap(), Frame::Sysex(Vec::new()));
}

#[test]
fn test_truncated_sysex() {
    assert!(is_eof(&read_one(&[240, 0x71, 0x68, 0])));
}

#[test]
fn test_oversized_sysex() {
    let mut bytes = vec![240, 0x42];
    bytes.extend(std::iter::repeat(0x01).take(MAX_SYSEX_SIZE + 1));
    bytes.push(247);
    assert!(matches!(
        read_one(&bytes),
        Err(FirmataError::MalformedFrame(_))
    ));
}

#[test]
fn test_read_back_to_back_frames() {
    let mut bytes = vec![0xF9, 2, 6];
    bytes.extend_from_slice(&[240, 0x71, 0x68, 0, 247]);
    bytes.extend_from_slice(&[0x90, 0x04, 0x00]);

    let mut reader = reader(&bytes);
    assert!(matches!(reader.read_frame().unwrap(), Frame::ProtocolVersion { .. }));
    assert!(matches!(reader.read_frame().unwrap(), Frame::StringData(_)));
    assert_eq!(
        reader.read_frame().unwrap(),
        Frame::Digital { port: 0, mask: 4 }
    );
    assert!(is_eof(&reader.read_frame()));
}
