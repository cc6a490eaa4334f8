//! Error types for the Firmata engine
//!
//! Provides a unified error type for all operations. Whether an error is
//! fatal depends on where it is raised: anything returned to a caller of a
//! board command is request-scoped, anything raised while processing an
//! inbound frame closes the connection.

use std::time::Duration;

use thiserror::Error;

use crate::board::{PinMode, PinName};

/// Result type alias using FirmataError
pub type Result<T> = std::result::Result<T, FirmataError>;

/// Unified error type for Firmata operations
#[derive(Debug, Error)]
pub enum FirmataError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported firmata command byte: 0x{0:02X}")]
    UnsupportedCommand(u8),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    // -------------------------------------------------------------------------
    // Validation Errors (request-scoped)
    // -------------------------------------------------------------------------
    #[error("Pin {pin} out of range (total pins: {total})")]
    PinOutOfRange { pin: u8, total: u8 },

    #[error("Port {port} out of range (total ports: {total})")]
    PortOutOfRange { port: u8, total: u8 },

    #[error("Pin {pin} does not support mode {mode}")]
    UnsupportedMode { pin: u8, mode: PinMode },

    #[error("Pin {pin} accepts 0/1, but got {value}")]
    InvalidDigitalValue { pin: u8, value: u32 },

    #[error("{kind} payload too large: {actual} bytes (max {max})")]
    PayloadTooLarge {
        kind: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("I2C address 0x{0:X} does not fit in 10 bits")]
    InvalidI2cAddress(u16),

    #[error("Invalid pin name: {0}")]
    InvalidPinName(String),

    #[error("Invalid pin mode: {0}")]
    InvalidPinMode(String),

    #[error("Malformed {what} response: {reason}")]
    MalformedResponse { what: &'static str, reason: String },

    // -------------------------------------------------------------------------
    // Protocol Consistency Errors (connection-fatal)
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Digital port {port} reported mask 0b{mask:08b} outside inputs 0b{inputs:08b}")]
    PortMaskMismatch { port: u8, mask: u8, inputs: u8 },

    #[error("Pin names reply contains duplicated name {0}")]
    DuplicatePinName(PinName),

    #[error("Capability response has invalid pin count: {0}")]
    PinCountOverflow(usize),

    #[error("Pin {pin} reported pull-up state {got}, expected {expected}")]
    PinStateMismatch { pin: u8, expected: u32, got: u32 },

    #[error("Device rebooted")]
    DeviceRebooted,

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Firmata closed")]
    Closed,

    #[error("Handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),
}
