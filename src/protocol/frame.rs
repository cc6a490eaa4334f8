//! Inbound frames
//!
//! Decoding of everything the board can send. The stream reader delimits the
//! bytes; the functions here turn one delimited frame into a `Frame`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::bits::{decode14, join14};
use super::constants::*;
use crate::board::{PinMode, PinName};
use crate::error::{FirmataError, Result};

/// One decoded inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// REPORT_VERSION reply
    ProtocolVersion { major: u8, minor: u8 },

    /// REPORT_FIRMWARE reply
    Firmware { major: u8, minor: u8, name: String },

    /// CAPABILITY_RESPONSE
    Capabilities(CapabilityResponse),

    /// ANALOG_MAPPING_RESPONSE: one byte per digital pin, 0x7F = not analog
    AnalogMapping(Vec<u8>),

    /// PIN_STATE_RESPONSE
    PinState { pin: u8, mode: PinMode, state: u32 },

    /// Analog sample; `pin` is the analog index (0..=15)
    Analog { pin: u8, value: u32 },

    /// Digital port report; `mask` holds the port's 8 pin levels
    Digital { port: u8, mask: u8 },

    /// I2C_REPLY
    I2cReply(I2cReply),

    /// Pin names reply, one name per digital pin
    PinNames(Vec<PinName>),

    /// STRING_DATA, already unpacked from 7-bit pairs
    StringData(Vec<u8>),

    /// Any other sysex: sub-command followed by its raw payload
    Sysex(Vec<u8>),
}

/// Supported modes of every pin, in digital index order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub pins: Vec<BTreeMap<PinMode, u8>>,
}

impl CapabilityResponse {
    pub fn total_pins(&self) -> usize {
        self.pins.len()
    }

    /// Number of 8-pin digital ports covering all pins
    pub fn total_ports(&self) -> usize {
        (self.pins.len() + 7) / 8
    }
}

/// Data read from an I2C device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cReply {
    pub address: u16,
    pub register: u16,
    pub data: Vec<u8>,
}

// =============================================================================
// Fixed-size Messages
// =============================================================================

/// Decode a three-byte message from its command byte and two data bytes
pub fn decode_message(command: u8, data: [u8; 2]) -> Result<Frame> {
    match command {
        REPORT_VERSION => Ok(Frame::ProtocolVersion {
            major: data[0],
            minor: data[1],
        }),
        ANALOG_MESSAGE..=ANALOG_MESSAGE_END => Ok(Frame::Analog {
            pin: command & 0x0F,
            value: u32::from(join14(data[0], data[1])),
        }),
        DIGITAL_MESSAGE..=DIGITAL_MESSAGE_END => Ok(Frame::Digital {
            port: command & 0x0F,
            // Bit 7 of the port rides in the low bit of the second byte
            mask: (data[0] & 0x7F) | ((data[1] & 0x01) << 7),
        }),
        other => Err(FirmataError::UnsupportedCommand(other)),
    }
}

// =============================================================================
// Sysex Messages
// =============================================================================

/// Decode the body of a sysex frame (between START_SYSEX and END_SYSEX)
pub fn decode_sysex(body: &[u8]) -> Result<Frame> {
    let (&command, payload) = match body.split_first() {
        Some(parts) => parts,
        None => return Ok(Frame::Sysex(Vec::new())),
    };

    match command {
        REPORT_FIRMWARE => decode_firmware(payload),
        CAPABILITY_RESPONSE => decode_capabilities(payload).map(Frame::Capabilities),
        ANALOG_MAPPING_RESPONSE => Ok(Frame::AnalogMapping(payload.to_vec())),
        PIN_STATE_RESPONSE => decode_pin_state(payload),
        I2C_REPLY => decode_i2c_reply(payload).map(Frame::I2cReply),
        PIN_NAMES_REPLY => Ok(Frame::PinNames(
            decode14(payload).into_iter().map(PinName).collect(),
        )),
        STRING_DATA => Ok(Frame::StringData(decode14(payload))),
        _ => Ok(Frame::Sysex(body.to_vec())),
    }
}

fn decode_firmware(payload: &[u8]) -> Result<Frame> {
    if payload.len() < 2 {
        return Err(FirmataError::MalformedFrame(format!(
            "firmware report: expected at least 2 bytes, got {}",
            payload.len()
        )));
    }
    let mut name = decode14(&payload[2..]);
    name.retain(|&b| b != 0);
    Ok(Frame::Firmware {
        major: payload[0],
        minor: payload[1],
        name: String::from_utf8_lossy(&name).into_owned(),
    })
}

fn decode_capabilities(payload: &[u8]) -> Result<CapabilityResponse> {
    let mut response = CapabilityResponse::default();
    let mut modes = BTreeMap::new();
    let mut bytes = payload.iter().copied();

    while let Some(byte) = bytes.next() {
        if byte == PIN_TERMINATOR {
            response.pins.push(std::mem::take(&mut modes));
            continue;
        }
        let resolution = bytes.next().ok_or_else(|| {
            FirmataError::MalformedFrame(format!(
                "capability response: mode 0x{:02x} of pin {} has no resolution",
                byte,
                response.pins.len()
            ))
        })?;
        modes.insert(PinMode(byte), resolution);
    }

    if !modes.is_empty() {
        return Err(FirmataError::MalformedFrame(format!(
            "capability response: pin {} is not terminated",
            response.pins.len()
        )));
    }
    Ok(response)
}

fn decode_pin_state(payload: &[u8]) -> Result<Frame> {
    if payload.len() < 2 {
        return Err(FirmataError::MalformedFrame(format!(
            "pin state response: expected at least 2 bytes, got {}",
            payload.len()
        )));
    }
    let state = payload[2..]
        .iter()
        .take(4)
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (u32::from(b & 0x7F) << (7 * i)));
    Ok(Frame::PinState {
        pin: payload[0],
        mode: PinMode(payload[1]),
        state,
    })
}

fn decode_i2c_reply(payload: &[u8]) -> Result<I2cReply> {
    if payload.len() < 4 {
        return Err(FirmataError::MalformedFrame(format!(
            "I2C reply: expected at least 4 bytes, got {}",
            payload.len()
        )));
    }
    let data = payload[4..]
        .chunks_exact(2)
        .map(|pair| join14(pair[0], pair[1]) as u8)
        .collect();
    Ok(I2cReply {
        address: join14(payload[0], payload[1]),
        register: join14(payload[2], payload[3]),
        data,
    })
}
