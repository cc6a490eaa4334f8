//! Frame reader
//!
//! Pulls whole frames off a byte stream. Blocks until a complete frame is
//! available or the stream fails.

use std::io::Read;

use bytes::{BufMut, BytesMut};

use super::constants::{
    ANALOG_MESSAGE, ANALOG_MESSAGE_END, DIGITAL_MESSAGE, DIGITAL_MESSAGE_END, END_SYSEX,
    REPORT_VERSION, START_SYSEX,
};
use super::frame::{decode_message, decode_sysex, Frame};
use crate::error::{FirmataError, Result};

/// Largest sysex body accepted before the stream is considered corrupt
pub const MAX_SYSEX_SIZE: usize = 1373;

/// Reads frames from any `Read` source
///
/// Wrap unbuffered sources (sockets, serial ports) in a `BufReader`: the
/// sysex body is scanned one byte at a time.
pub struct FrameReader<R> {
    reader: R,

    /// Sysex body of the frame being read
    buf: BytesMut,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Read the next complete frame
    pub fn read_frame(&mut self) -> Result<Frame> {
        let command = self.read_byte()?;
        if command == START_SYSEX {
            self.read_sysex_body()?;
            return decode_sysex(&self.buf);
        }

        // Reject before consuming data bytes that may belong to the next frame
        if !is_fixed_message(command) {
            return Err(FirmataError::UnsupportedCommand(command));
        }
        let mut data = [0u8; 2];
        self.reader.read_exact(&mut data)?;
        decode_message(command, data)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn read_sysex_body(&mut self) -> Result<()> {
        self.buf.clear();
        loop {
            let byte = self.read_byte()?;
            if byte == END_SYSEX {
                return Ok(());
            }
            if self.buf.len() >= MAX_SYSEX_SIZE {
                return Err(FirmataError::MalformedFrame(format!(
                    "sysex body exceeds {} bytes",
                    MAX_SYSEX_SIZE
                )));
            }
            self.buf.put_u8(byte);
        }
    }
}

fn is_fixed_message(command: u8) -> bool {
    matches!(
        command,
        REPORT_VERSION | ANALOG_MESSAGE..=ANALOG_MESSAGE_END | DIGITAL_MESSAGE..=DIGITAL_MESSAGE_END
    )
}
