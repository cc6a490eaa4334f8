//! Session
//!
//! Everything the engine loop owns: the board model, the frame writer, the
//! hooks and the handshake bookkeeping. A `Session` has no threads of its
//! own; the loop feeds it frames and caller closures one at a time.
//!
//! ## Handshake
//! Each handshake reply fills one board field, but only while that field is
//! still empty. A reply whose prerequisite is missing, or a runtime frame
//! that arrives too early, makes the session re-request the earliest missing
//! field instead of failing:
//!
//! ```text
//! F9 ──► F0 79 F7 ──► F0 6B F7 ──► F0 69 F7 ──► F0 6D n F7 (every pin)
//!                                               F0 06 F7 ──► connected
//! ```

use std::io::Write;

use crossbeam::channel::Sender;

use super::hooks::Hooks;
use crate::board::{Board, Pin, PinMode, PinName, Stage, Version};
use crate::error::{FirmataError, Result};
use crate::protocol::constants::{MAX_14BIT, MAX_I2C_DATA_BYTES, MAX_STRING_DATA_BYTES};
use crate::protocol::{CapabilityResponse, Frame, FrameWriter};

/// String data prefix the firmware prints after a reboot
const REBOOT_SIGNATURE: &[u8] = b"Booting";

/// Analog messages address channels 0..=15 only
const MAX_ANALOG_MESSAGE_PIN: u8 = 15;

/// Loop-owned connection state
pub struct Session {
    board: Board,
    writer: FrameWriter<Box<dyn Write + Send>>,
    hooks: Hooks,

    /// Whether the connected notification fired for the current handshake
    connected: bool,

    /// Wakes the thread waiting in `Firmata::connect`
    connected_signal: Option<Sender<()>>,
}

impl Session {
    pub fn new<W: Write + Send + 'static>(writer: W, hooks: Hooks) -> Self {
        Self {
            board: Board::new(),
            writer: FrameWriter::new(Box::new(writer)),
            hooks,
            connected: false,
            connected_signal: None,
        }
    }

    pub(crate) fn with_connected_signal(mut self, signal: Sender<()>) -> Self {
        self.connected_signal = Some(signal);
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn stage(&self) -> Stage {
        self.board.stage()
    }

    // =========================================================================
    // Handshake
    // =========================================================================

    /// Request the earliest field the board has not reported yet
    pub fn request_next(&mut self) -> Result<()> {
        let stage = self.board.stage();
        tracing::debug!("Handshake stage {:?}: requesting next field", stage);
        match stage {
            Stage::AwaitVersion => self.writer.report_version(),
            Stage::AwaitFirmware => self.writer.report_firmware(),
            Stage::AwaitCapabilities => self.writer.capability_query(),
            Stage::AwaitAnalogMapping => self.writer.analog_mapping_query(),
            Stage::AwaitPinNames => self.writer.pin_names_request(),
            Stage::Connected => Ok(()),
        }
    }

    /// Apply one inbound frame
    ///
    /// An error returned from here is fatal for the connection.
    pub fn process_frame(&mut self, frame: Frame) -> Result<()> {
        tracing::trace!("Processing frame: {:?}", frame);
        match frame {
            Frame::ProtocolVersion { major, minor } => self.on_protocol_version(major, minor),
            Frame::Firmware { major, minor, name } => self.on_firmware(major, minor, name),
            Frame::Capabilities(capabilities) => self.on_capabilities(capabilities),
            Frame::AnalogMapping(mapping) => self.on_analog_mapping(mapping),
            Frame::PinNames(names) => self.on_pin_names(names),
            Frame::PinState { pin, mode, state } => {
                if self.ready_for(Stage::AwaitPinNames)? {
                    self.on_pin_state(pin, mode, state)?;
                }
                Ok(())
            }
            Frame::Analog { pin, value } => {
                if self.ready_for(Stage::Connected)? {
                    let pin = self.board.apply_analog_value(pin, value)?.clone();
                    (self.hooks.analog_message)(&self.board, &pin);
                }
                Ok(())
            }
            Frame::Digital { port, mask } => {
                if self.ready_for(Stage::Connected)? {
                    let changed = self.board.apply_digital_input(port, mask)?;
                    (self.hooks.digital_message)(&self.board, port, changed, mask);
                }
                Ok(())
            }
            Frame::I2cReply(reply) => {
                if self.ready_for(Stage::Connected)? {
                    (self.hooks.i2c_reply)(&self.board, &reply);
                }
                Ok(())
            }
            Frame::StringData(data) => {
                if self.ready_for(Stage::Connected)? {
                    (self.hooks.string_data)(&self.board, &data);
                    if data.starts_with(REBOOT_SIGNATURE) {
                        return Err(FirmataError::DeviceRebooted);
                    }
                }
                Ok(())
            }
            Frame::Sysex(payload) => {
                if self.ready_for(Stage::Connected)? {
                    (self.hooks.sysex)(&self.board, &payload);
                }
                Ok(())
            }
        }
    }

    /// Whether the handshake has reached `needed`; if not, re-request the
    /// earliest missing field
    fn ready_for(&mut self, needed: Stage) -> Result<bool> {
        let stage = self.board.stage();
        let ready = match needed {
            Stage::AwaitPinNames => matches!(stage, Stage::AwaitPinNames | Stage::Connected),
            _ => stage == Stage::Connected,
        };
        if !ready {
            tracing::debug!("Runtime frame before handshake completed (stage {:?})", stage);
            self.request_next()?;
        }
        Ok(ready)
    }

    fn on_protocol_version(&mut self, major: u8, minor: u8) -> Result<()> {
        if self.board.protocol_version().is_some() {
            return Ok(());
        }
        let version = Version::protocol(major, minor);
        tracing::debug!(
            "Protocol version {} ({:?})",
            version.server.name,
            version.compatibility
        );
        self.board.set_protocol_version(version);
        self.request_next()
    }

    fn on_firmware(&mut self, major: u8, minor: u8, name: String) -> Result<()> {
        if self.board.protocol_version().is_none() {
            return self.request_next();
        }
        if self.board.firmware_version().is_some() {
            return Ok(());
        }
        tracing::debug!("Firmware {} v{}.{}", name, major, minor);
        self.board
            .set_firmware_version(Version::firmware(major, minor, name));
        self.request_next()
    }

    fn on_capabilities(&mut self, capabilities: CapabilityResponse) -> Result<()> {
        if self.board.firmware_version().is_none() {
            return self.request_next();
        }
        if self.board.stage() != Stage::AwaitCapabilities {
            return Ok(());
        }
        self.board.set_capabilities(capabilities)?;
        tracing::debug!(
            "Capabilities: {} pins, {} ports",
            self.board.total_pins(),
            self.board.total_ports()
        );
        self.request_next()
    }

    fn on_analog_mapping(&mut self, mapping: Vec<u8>) -> Result<()> {
        match self.board.stage() {
            Stage::AwaitVersion | Stage::AwaitFirmware | Stage::AwaitCapabilities => {
                return self.request_next()
            }
            Stage::AwaitAnalogMapping => {}
            Stage::AwaitPinNames | Stage::Connected => return Ok(()),
        }
        let total = self.board.total_pins() as usize;
        if mapping.len() > total {
            return self.reject(
                "analog mapping",
                format!("{} entries for {} pins", mapping.len(), total),
            );
        }
        self.board.set_analog_mapping(&mapping);
        tracing::debug!("Analog mapping: {} analog pins", self.board.total_analog_pins());

        for dx in 0..self.board.total_pins() {
            self.writer.pin_state_query(dx)?;
        }
        self.request_next()
    }

    fn on_pin_names(&mut self, names: Vec<PinName>) -> Result<()> {
        match self.board.stage() {
            Stage::AwaitPinNames => {}
            Stage::Connected => return Ok(()),
            _ => return self.request_next(),
        }
        let total = self.board.total_pins() as usize;
        if names.len() != total {
            return self.reject(
                "pin names",
                format!("{} names for {} pins", names.len(), total),
            );
        }
        self.board.set_pin_names(&names)?;
        self.fire_connected();
        Ok(())
    }

    fn on_pin_state(&mut self, dx: u8, mode: PinMode, state: u32) -> Result<()> {
        let pin = self.board.apply_pin_state(dx, mode, state)?.clone();
        if self.board.stage() == Stage::Connected {
            (self.hooks.pin_state)(&self.board, &pin);
        }
        Ok(())
    }

    /// Drop a malformed handshake reply and ask for it again
    fn reject(&mut self, what: &'static str, reason: String) -> Result<()> {
        let error = FirmataError::MalformedResponse { what, reason };
        tracing::warn!("Rejected reply: {}", error);
        self.request_next()
    }

    fn fire_connected(&mut self) {
        if self.connected {
            return;
        }
        self.connected = true;
        tracing::info!(
            "Connected to {} ({} pins, {} analog)",
            self.board.firmware_name(),
            self.board.total_pins(),
            self.board.total_analog_pins()
        );
        (self.hooks.connected)(&self.board);
        // After the hook, so `Firmata::connect` returns with it already run
        if let Some(signal) = &self.connected_signal {
            let _ = signal.try_send(());
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn checked_pin(&self, dx: u8) -> Result<&Pin> {
        self.board.pin(dx).ok_or(FirmataError::PinOutOfRange {
            pin: dx,
            total: self.board.total_pins(),
        })
    }

    /// A value write needs the pin's current mode to be one it supports
    fn writable_pin(&self, dx: u8) -> Result<&Pin> {
        let pin = self.checked_pin(dx)?;
        if !pin.supports(pin.mode) {
            return Err(FirmataError::UnsupportedMode {
                pin: dx,
                mode: pin.mode,
            });
        }
        Ok(pin)
    }

    fn checked_port(&self, port: u8) -> Result<()> {
        if port >= self.board.total_ports() {
            return Err(FirmataError::PortOutOfRange {
                port,
                total: self.board.total_ports(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// System reset; forgets the board and restarts the handshake
    pub fn reset(&mut self) -> Result<()> {
        self.writer.reset()?;
        self.board.clear();
        self.connected = false;
        tracing::info!("Board reset, restarting handshake");
        self.request_next()
    }

    pub fn set_sampling_interval(&mut self, ms: u32) -> Result<()> {
        self.writer.sampling_interval(ms)
    }

    pub fn set_pin_mode(&mut self, dx: u8, mode: PinMode) -> Result<()> {
        let pin = self.checked_pin(dx)?;
        if !pin.supports(mode) {
            return Err(FirmataError::UnsupportedMode { pin: dx, mode });
        }
        if pin.mode == mode {
            return Ok(());
        }
        self.writer.set_pin_mode(dx, mode)?;
        self.board.apply_pin_mode(dx, mode);
        Ok(())
    }

    pub fn set_digital_pin_value(&mut self, dx: u8, value: u8) -> Result<()> {
        let pin = self.writable_pin(dx)?;
        if value > 1 {
            return Err(FirmataError::InvalidDigitalValue {
                pin: dx,
                value: u32::from(value),
            });
        }
        if pin.value == u32::from(value) {
            return Ok(());
        }
        self.writer.set_digital_pin_value(dx, value)?;
        if let Some(pin) = self.board.pin_mut(dx) {
            pin.value = u32::from(value);
        }
        Ok(())
    }

    pub fn set_digital_pin_high(&mut self, dx: u8) -> Result<()> {
        self.set_digital_pin_value(dx, 1)
    }

    pub fn set_digital_pin_low(&mut self, dx: u8) -> Result<()> {
        self.set_digital_pin_value(dx, 0)
    }

    /// Analog write for PWM/servo pins, digital write otherwise
    pub fn set_pin_value(&mut self, dx: u8, value: u32) -> Result<()> {
        if self.writable_pin(dx)?.mode.is_analog_output() {
            return self.analog_write(dx, value);
        }
        let digital = u8::try_from(value)
            .ok()
            .filter(|v| *v <= 1)
            .ok_or(FirmataError::InvalidDigitalValue { pin: dx, value })?;
        self.set_digital_pin_value(dx, digital)
    }

    /// Write all pins of a port; returns the mask of pins whose model changed
    pub fn digital_write(&mut self, port: u8, values: u8) -> Result<u8> {
        self.checked_port(port)?;
        self.writer.digital_write(port, values)?;
        Ok(self.board.apply_digital_output(port, values))
    }

    pub fn analog_write(&mut self, dx: u8, value: u32) -> Result<()> {
        self.writable_pin(dx)?;
        if dx > MAX_ANALOG_MESSAGE_PIN || value > MAX_14BIT {
            self.writer.extended_analog_write(dx, value)?;
        } else {
            self.writer.analog_write(dx, value)?;
        }
        if let Some(pin) = self.board.pin_mut(dx) {
            pin.value = value;
        }
        Ok(())
    }

    pub fn servo_config(&mut self, dx: u8, min_pulse: u32, max_pulse: u32) -> Result<()> {
        self.checked_pin(dx)?;
        self.writer.servo_config(dx, min_pulse, max_pulse)
    }

    pub fn pin_state_query(&mut self, dx: u8) -> Result<()> {
        self.checked_pin(dx)?;
        self.writer.pin_state_query(dx)
    }

    /// Last known logical state of a pin
    pub fn pin_state(&self, dx: u8) -> Result<u32> {
        Ok(self.checked_pin(dx)?.state)
    }

    /// Enable or disable sampling of an analog channel
    ///
    /// The message addresses channels 0..=15 only.
    pub fn report_analog(&mut self, ax: u8, enable: bool) -> Result<()> {
        if ax > MAX_ANALOG_MESSAGE_PIN || self.board.analog_pin(ax).is_none() {
            return Err(FirmataError::PinOutOfRange {
                pin: ax,
                total: self.board.total_analog_pins(),
            });
        }
        self.writer.report_analog(ax, enable)
    }

    pub fn report_digital(&mut self, port: u8, enable: bool) -> Result<()> {
        self.checked_port(port)?;
        self.writer.report_digital(port, enable)
    }

    pub fn i2c_config(&mut self, delay_us: u32) -> Result<()> {
        self.writer.i2c_config(delay_us)
    }

    pub fn i2c_write(&mut self, address: u16, data: &[u8]) -> Result<()> {
        if data.len() > MAX_I2C_DATA_BYTES {
            return Err(FirmataError::PayloadTooLarge {
                kind: "I2C",
                max: MAX_I2C_DATA_BYTES,
                actual: data.len(),
            });
        }
        self.writer.i2c_write(address, data)
    }

    pub fn i2c_read(
        &mut self,
        address: u16,
        auto_restart: bool,
        continuous: bool,
        count: u16,
    ) -> Result<()> {
        self.writer.i2c_read(address, auto_restart, continuous, count)
    }

    pub fn i2c_stop_reading(&mut self, address: u16) -> Result<()> {
        self.writer.i2c_stop_reading(address)
    }

    pub fn string_write(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_STRING_DATA_BYTES {
            return Err(FirmataError::PayloadTooLarge {
                kind: "string",
                max: MAX_STRING_DATA_BYTES,
                actual: data.len(),
            });
        }
        self.writer.string_write(data)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("stage", &self.board.stage())
            .field("connected", &self.connected)
            .finish()
    }
}
