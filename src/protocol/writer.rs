//! Frame writer
//!
//! Encodes outbound commands. Every operation emits one complete frame with a
//! single `write_all` followed by a flush, so a frame is never interleaved
//! with another.

use std::io::Write;

use bytes::{BufMut, BytesMut};

use super::bits::{encode14, split14};
use super::constants::*;
use crate::board::PinMode;
use crate::error::{FirmataError, Result};

/// Writes frames to any `Write` sink
pub struct FrameWriter<W> {
    writer: W,

    /// Scratch frame for I2C requests, START_SYSEX and I2C_REQUEST prefilled
    i2c_buf: [u8; MAX_DATA_BYTES],
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        let mut i2c_buf = [0u8; MAX_DATA_BYTES];
        i2c_buf[0] = START_SYSEX;
        i2c_buf[1] = I2C_REQUEST;
        Self { writer, i2c_buf }
    }

    /// Give back the underlying sink
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()?;
        Ok(())
    }

    fn send_i2c(&mut self, len: usize) -> Result<()> {
        self.writer.write_all(&self.i2c_buf[..len])?;
        self.writer.flush()?;
        Ok(())
    }

    fn send_sysex(&mut self, command: u8, payload: &[u8]) -> Result<()> {
        let mut frame = BytesMut::with_capacity(payload.len() + 3);
        frame.put_u8(START_SYSEX);
        frame.put_u8(command);
        frame.put_slice(payload);
        frame.put_u8(END_SYSEX);
        self.send(&frame)
    }

    // =========================================================================
    // Fixed-size Messages
    // =========================================================================

    pub fn reset(&mut self) -> Result<()> {
        self.send(&[SYSTEM_RESET])
    }

    pub fn report_version(&mut self) -> Result<()> {
        self.send(&[REPORT_VERSION])
    }

    pub fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        self.send(&[SET_PIN_MODE, pin & 0x7F, mode.0 & 0x7F])
    }

    pub fn set_digital_pin_value(&mut self, pin: u8, value: u8) -> Result<()> {
        self.send(&[SET_DIGITAL_PIN_VALUE, pin & 0x7F, value & 0x01])
    }

    /// Write all 8 pin levels of a digital port
    pub fn digital_write(&mut self, port: u8, mask: u8) -> Result<()> {
        self.send(&[DIGITAL_MESSAGE | (port & 0x0F), mask & 0x7F, mask >> 7])
    }

    /// Analog message for pins 0..=15 and 14-bit values; larger pins or
    /// values need `extended_analog_write`
    pub fn analog_write(&mut self, pin: u8, value: u32) -> Result<()> {
        let [low, high] = split14(value);
        self.send(&[ANALOG_MESSAGE | (pin & 0x0F), low, high])
    }

    pub fn report_analog(&mut self, pin: u8, enable: bool) -> Result<()> {
        self.send(&[REPORT_ANALOG | (pin & 0x0F), u8::from(enable)])
    }

    pub fn report_digital(&mut self, port: u8, enable: bool) -> Result<()> {
        self.send(&[REPORT_DIGITAL | (port & 0x0F), u8::from(enable)])
    }

    // =========================================================================
    // Sysex Messages
    // =========================================================================

    /// Value split into as many 7-bit groups as it needs (1..=5)
    pub fn extended_analog_write(&mut self, pin: u8, value: u32) -> Result<()> {
        let mut payload = BytesMut::with_capacity(6);
        payload.put_u8(pin & 0x7F);
        let mut rest = value;
        loop {
            payload.put_u8((rest & 0x7F) as u8);
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        self.send_sysex(EXTENDED_ANALOG, &payload)
    }

    pub fn report_firmware(&mut self) -> Result<()> {
        self.send_sysex(REPORT_FIRMWARE, &[])
    }

    pub fn capability_query(&mut self) -> Result<()> {
        self.send_sysex(CAPABILITY_QUERY, &[])
    }

    pub fn analog_mapping_query(&mut self) -> Result<()> {
        self.send_sysex(ANALOG_MAPPING_QUERY, &[])
    }

    pub fn pin_names_request(&mut self) -> Result<()> {
        self.send_sysex(PIN_NAMES_REQUEST, &[])
    }

    pub fn pin_state_query(&mut self, pin: u8) -> Result<()> {
        self.send_sysex(PIN_STATE_QUERY, &[pin & 0x7F])
    }

    /// Pulse widths are clamped to 14 bits
    pub fn servo_config(&mut self, pin: u8, min_pulse: u32, max_pulse: u32) -> Result<()> {
        let [min_low, min_high] = split14(min_pulse.min(MAX_14BIT));
        let [max_low, max_high] = split14(max_pulse.min(MAX_14BIT));
        self.send_sysex(
            SERVO_CONFIG,
            &[pin & 0x7F, min_low, min_high, max_low, max_high],
        )
    }

    /// Interval is clamped to 14 bits
    pub fn sampling_interval(&mut self, ms: u32) -> Result<()> {
        self.send_sysex(SAMPLING_INTERVAL, &split14(ms.min(MAX_14BIT)))
    }

    pub fn string_write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_STRING_DATA_BYTES {
            return Err(FirmataError::PayloadTooLarge {
                kind: "string",
                max: MAX_STRING_DATA_BYTES,
                actual: data.len(),
            });
        }
        self.send_sysex(STRING_DATA, &encode14(data))
    }

    // =========================================================================
    // I2C
    // =========================================================================

    /// Delay between a register write and the following read, clamped to 14 bits
    pub fn i2c_config(&mut self, delay_us: u32) -> Result<()> {
        self.send_sysex(I2C_CONFIG, &split14(delay_us.min(MAX_14BIT)))
    }

    pub fn i2c_write(&mut self, address: u16, data: &[u8]) -> Result<()> {
        if data.len() > MAX_I2C_DATA_BYTES {
            return Err(FirmataError::PayloadTooLarge {
                kind: "I2C",
                max: MAX_I2C_DATA_BYTES,
                actual: data.len(),
            });
        }
        let header = i2c_header(address, I2C_MODE_WRITE)?;
        self.i2c_buf[2..4].copy_from_slice(&header);
        let mut end = 4;
        for &byte in data {
            self.i2c_buf[end] = byte & 0x7F;
            self.i2c_buf[end + 1] = byte >> 7;
            end += 2;
        }
        self.i2c_buf[end] = END_SYSEX;
        self.send_i2c(end + 1)
    }

    /// Ask for `count` bytes (14 bits at most), once or continuously
    pub fn i2c_read(
        &mut self,
        address: u16,
        auto_restart: bool,
        continuous: bool,
        count: u16,
    ) -> Result<()> {
        let mut mode = if continuous {
            I2C_MODE_READ_CONTINUOUSLY
        } else {
            I2C_MODE_READ_ONCE
        };
        if auto_restart {
            mode |= I2C_AUTO_RESTART;
        }
        if u32::from(count) > MAX_14BIT {
            return Err(FirmataError::PayloadTooLarge {
                kind: "I2C read",
                max: MAX_14BIT as usize,
                actual: usize::from(count),
            });
        }
        let header = i2c_header(address, mode)?;
        let [low, high] = split14(u32::from(count));
        self.i2c_buf[2..4].copy_from_slice(&header);
        self.i2c_buf[4] = low;
        self.i2c_buf[5] = high;
        self.i2c_buf[6] = END_SYSEX;
        self.send_i2c(7)
    }

    pub fn i2c_stop_reading(&mut self, address: u16) -> Result<()> {
        let header = i2c_header(address, I2C_MODE_STOP_READING)?;
        self.i2c_buf[2..4].copy_from_slice(&header);
        self.i2c_buf[4] = END_SYSEX;
        self.send_i2c(5)
    }
}

/// Address LSB and mode byte; addresses above 0x7F switch to 10-bit mode
fn i2c_header(address: u16, mode: u8) -> Result<[u8; 2]> {
    if address > 0x3FF {
        return Err(FirmataError::InvalidI2cAddress(address));
    }
    if address > 0x7F {
        let high = ((address >> 7) & 0x07) as u8;
        return Ok([(address & 0x7F) as u8, mode | I2C_10BIT_ADDRESS | high]);
    }
    Ok([address as u8, mode])
}
