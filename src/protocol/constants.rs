//! Protocol constants
//!
//! Command bytes, sysex sub-commands and size limits of Firmata 2.6.
//! See <https://github.com/firmata/protocol>.

// =============================================================================
// Versions
// =============================================================================

pub const PROTOCOL_MAJOR_VERSION: u8 = 2;
pub const PROTOCOL_MINOR_VERSION: u8 = 6;
pub const PROTOCOL_BUGFIX_VERSION: u8 = 0;

pub const FIRMWARE_MAJOR_VERSION: u8 = 2;
pub const FIRMWARE_MINOR_VERSION: u8 = 11;
pub const FIRMWARE_BUGFIX_VERSION: u8 = 0;

// =============================================================================
// Size Limits
// =============================================================================

/// Max number of data bytes in one sysex message, framing included
pub const MAX_DATA_BYTES: usize = 64;

/// Max raw bytes in one I2C write: header (4) + END_SYSEX, two wire bytes each
pub const MAX_I2C_DATA_BYTES: usize = (MAX_DATA_BYTES - 5) / 2;

/// Max raw bytes in one string write
pub const MAX_STRING_DATA_BYTES: usize = (MAX_DATA_BYTES - 3) / 2;

/// Largest value representable by two 7-bit wire bytes
pub const MAX_14BIT: u32 = 0x3FFF;

// =============================================================================
// Message Commands (0x80-0xFF)
// =============================================================================

pub const DIGITAL_MESSAGE: u8 = 0x90;
pub const DIGITAL_MESSAGE_END: u8 = 0x9F;
pub const REPORT_ANALOG: u8 = 0xC0;
pub const REPORT_DIGITAL: u8 = 0xD0;
pub const ANALOG_MESSAGE: u8 = 0xE0;
pub const ANALOG_MESSAGE_END: u8 = 0xEF;
pub const START_SYSEX: u8 = 0xF0;
pub const SET_PIN_MODE: u8 = 0xF4;
pub const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;
pub const END_SYSEX: u8 = 0xF7;
pub const REPORT_VERSION: u8 = 0xF9;
pub const SYSTEM_RESET: u8 = 0xFF;

// =============================================================================
// Sysex Sub-commands (0x00-0x7F)
// =============================================================================

/// User-defined: ask the board for its MCU pin names
pub const PIN_NAMES_REQUEST: u8 = 0x06;
/// User-defined: one 14-bit pin name per digital pin
pub const PIN_NAMES_REPLY: u8 = 0x07;

pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
pub const CAPABILITY_QUERY: u8 = 0x6B;
pub const CAPABILITY_RESPONSE: u8 = 0x6C;
pub const PIN_STATE_QUERY: u8 = 0x6D;
pub const PIN_STATE_RESPONSE: u8 = 0x6E;
pub const EXTENDED_ANALOG: u8 = 0x6F;
pub const SERVO_CONFIG: u8 = 0x70;
pub const STRING_DATA: u8 = 0x71;
pub const I2C_REQUEST: u8 = 0x76;
pub const I2C_REPLY: u8 = 0x77;
pub const I2C_CONFIG: u8 = 0x78;
pub const REPORT_FIRMWARE: u8 = 0x79;
pub const SAMPLING_INTERVAL: u8 = 0x7A;

// =============================================================================
// Payload Markers
// =============================================================================

/// Ends one pin's (mode, resolution) list in a capability response, and marks
/// "not analog" in an analog mapping response
pub const PIN_TERMINATOR: u8 = 0x7F;

// =============================================================================
// I2C Mode Byte
// =============================================================================

pub const I2C_MODE_WRITE: u8 = 0b00 << 3;
pub const I2C_MODE_READ_ONCE: u8 = 0b01 << 3;
pub const I2C_MODE_READ_CONTINUOUSLY: u8 = 0b10 << 3;
pub const I2C_MODE_STOP_READING: u8 = 0b11 << 3;
pub const I2C_10BIT_ADDRESS: u8 = 1 << 5;
pub const I2C_AUTO_RESTART: u8 = 1 << 6;
