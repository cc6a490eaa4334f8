//! Board Module
//!
//! The host's model of the connected board: versions, pins, the analog
//! subset, pin names and the per-port input masks.
//!
//! The engine loop is the only writer. Every field that the handshake fills
//! starts as `None`, and the first empty field determines the `Stage`.

mod pin;
mod pin_name;
mod version;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FirmataError, Result};
use crate::protocol::CapabilityResponse;

pub use pin::{Pin, PinMode, NOT_ANALOG};
pub use pin_name::PinName;
pub use version::{Compatibility, PeerVersion, Version};

/// Digital ports addressable by a port message (low nibble)
pub const MAX_PORTS: usize = 16;

/// Pins coverable by MAX_PORTS 8-pin ports
pub const MAX_PINS: usize = MAX_PORTS * 8;

/// Where the handshake stands, derived from which board fields are populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    AwaitVersion,
    AwaitFirmware,
    AwaitCapabilities,
    AwaitAnalogMapping,
    AwaitPinNames,
    Connected,
}

/// Point-in-time copy of the whole board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub stage: Stage,
    pub protocol_version: Option<Version>,
    pub firmware_version: Option<Version>,
    pub total_ports: u8,
    pub pins: Vec<Pin>,
    /// Digital indices of the analog-capable pins, in digital order
    pub analog_pins: Vec<u8>,
}

/// Board model
#[derive(Debug, Default)]
pub struct Board {
    protocol_version: Option<Version>,
    firmware_version: Option<Version>,

    /// Every pin, indexed by digital index
    pins: Option<Vec<Pin>>,

    /// Digital indices of the analog subset; analog index i maps to
    /// `analog_pins[i]`
    analog_pins: Option<Vec<u8>>,

    names: Option<HashMap<PinName, u8>>,

    total_ports: u8,

    /// Per port, which pins are inputs (INPUT or PULLUP)
    port_inputs: [u8; MAX_PORTS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn stage(&self) -> Stage {
        if self.protocol_version.is_none() {
            Stage::AwaitVersion
        } else if self.firmware_version.is_none() {
            Stage::AwaitFirmware
        } else if self.pins.is_none() {
            Stage::AwaitCapabilities
        } else if self.analog_pins.is_none() {
            Stage::AwaitAnalogMapping
        } else if self.names.is_none() {
            Stage::AwaitPinNames
        } else {
            Stage::Connected
        }
    }

    pub fn protocol_version(&self) -> Option<&Version> {
        self.protocol_version.as_ref()
    }

    pub fn firmware_version(&self) -> Option<&Version> {
        self.firmware_version.as_ref()
    }

    /// Firmware name as reported by the board, empty before the reply
    pub fn firmware_name(&self) -> &str {
        self.firmware_version
            .as_ref()
            .map_or("", |v| v.server.name.as_str())
    }

    pub fn pins(&self) -> &[Pin] {
        self.pins.as_deref().unwrap_or(&[])
    }

    pub fn total_pins(&self) -> u8 {
        self.pins().len() as u8
    }

    pub fn total_ports(&self) -> u8 {
        self.total_ports
    }

    pub fn total_analog_pins(&self) -> u8 {
        self.analog_pins.as_ref().map_or(0, |a| a.len() as u8)
    }

    pub fn pin(&self, dx: u8) -> Option<&Pin> {
        self.pins().get(dx as usize)
    }

    /// Pin behind an analog index
    pub fn analog_pin(&self, ax: u8) -> Option<&Pin> {
        let dx = *self.analog_pins.as_ref()?.get(ax as usize)?;
        self.pin(dx)
    }

    /// Analog-capable pins, by analog index
    pub fn analog_pins(&self) -> impl Iterator<Item = &Pin> {
        self.analog_pins
            .iter()
            .flatten()
            .filter_map(move |&dx| self.pin(dx))
    }

    pub fn pin_by_name(&self, name: PinName) -> Option<&Pin> {
        let dx = *self.names.as_ref()?.get(&name)?;
        self.pin(dx)
    }

    /// Input mask of a digital port, 0 for ports out of range
    pub fn port_inputs(&self, port: u8) -> u8 {
        self.port_inputs.get(port as usize).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            stage: self.stage(),
            protocol_version: self.protocol_version.clone(),
            firmware_version: self.firmware_version.clone(),
            total_ports: self.total_ports,
            pins: self.pins().to_vec(),
            analog_pins: self.analog_pins.clone().unwrap_or_default(),
        }
    }

    // =========================================================================
    // Handshake Fields
    // =========================================================================

    /// Forget everything learned from the board
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn set_protocol_version(&mut self, version: Version) {
        self.protocol_version = Some(version);
    }

    pub(crate) fn set_firmware_version(&mut self, version: Version) {
        self.firmware_version = Some(version);
    }

    /// Create the pin table from a capability response
    pub(crate) fn set_capabilities(&mut self, capabilities: CapabilityResponse) -> Result<()> {
        let total = capabilities.total_pins();
        if total == 0 || total > MAX_PINS {
            return Err(FirmataError::PinCountOverflow(total));
        }
        self.total_ports = capabilities.total_ports() as u8;
        self.port_inputs = [0; MAX_PORTS];
        self.pins = Some(
            capabilities
                .pins
                .into_iter()
                .enumerate()
                .map(|(dx, modes)| Pin::new(dx as u8, modes))
                .collect(),
        );
        Ok(())
    }

    /// Assign analog indices; `mapping` holds one entry per digital pin
    pub(crate) fn set_analog_mapping(&mut self, mapping: &[u8]) {
        let mut subset = Vec::new();
        for (pin, &ax) in self.pins_mut().iter_mut().zip(mapping) {
            pin.ax = ax;
            if ax != NOT_ANALOG {
                subset.push(pin.dx);
            }
        }
        self.analog_pins = Some(subset);
    }

    /// Assign names; `names` holds one entry per digital pin
    pub(crate) fn set_pin_names(&mut self, names: &[PinName]) -> Result<()> {
        let mut by_name = HashMap::with_capacity(names.len());
        for (dx, &name) in names.iter().enumerate() {
            if by_name.insert(name, dx as u8).is_some() {
                return Err(FirmataError::DuplicatePinName(name));
            }
        }
        for (pin, &name) in self.pins_mut().iter_mut().zip(names) {
            pin.name = name;
        }
        self.names = Some(by_name);
        Ok(())
    }

    // =========================================================================
    // Pin State
    // =========================================================================

    fn pins_mut(&mut self) -> &mut [Pin] {
        self.pins.as_deref_mut().unwrap_or(&mut [])
    }

    pub(crate) fn pin_mut(&mut self, dx: u8) -> Option<&mut Pin> {
        self.pins_mut().get_mut(dx as usize)
    }

    /// Apply a mode change to the model
    ///
    /// Resets state, keeps the port input mask in sync, marks pull-ups as
    /// logically high and zeroes the value of output-like modes.
    pub(crate) fn apply_pin_mode(&mut self, dx: u8, mode: PinMode) {
        let port = (dx / 8) as usize;
        let bit = 1u8 << (dx % 8);
        let Some(pin) = self.pin_mut(dx) else {
            return;
        };

        pin.mode = mode;
        pin.state = 0;
        let input = mode == PinMode::INPUT || mode == PinMode::PULLUP;
        if mode == PinMode::PULLUP {
            pin.state = 1;
        }
        if matches!(mode, PinMode::OUTPUT | PinMode::PWM | PinMode::STEPPER) {
            pin.value = 0;
        }

        if input {
            self.port_inputs[port] |= bit;
        } else {
            self.port_inputs[port] &= !bit;
        }
    }

    /// Apply a PIN_STATE_RESPONSE
    pub(crate) fn apply_pin_state(&mut self, dx: u8, mode: PinMode, state: u32) -> Result<&Pin> {
        let total = self.total_pins();
        if self.pin(dx).is_none() {
            return Err(FirmataError::PinOutOfRange { pin: dx, total });
        }
        self.apply_pin_mode(dx, mode);
        let pin = self
            .pin_mut(dx)
            .ok_or(FirmataError::PinOutOfRange { pin: dx, total })?;
        if mode == PinMode::PULLUP && state != pin.state {
            return Err(FirmataError::PinStateMismatch {
                pin: dx,
                expected: pin.state,
                got: state,
            });
        }
        pin.state = state;
        Ok(pin)
    }

    /// Apply an analog sample; returns the sampled pin
    pub(crate) fn apply_analog_value(&mut self, ax: u8, value: u32) -> Result<&Pin> {
        let total = self.total_analog_pins();
        let dx = self
            .analog_pins
            .as_ref()
            .and_then(|subset| subset.get(ax as usize).copied())
            .ok_or(FirmataError::PinOutOfRange { pin: ax, total })?;
        let pin = self
            .pin_mut(dx)
            .ok_or(FirmataError::PinOutOfRange { pin: ax, total })?;
        pin.value = value;
        Ok(pin)
    }

    /// Apply a digital port report; returns the mask of input pins whose
    /// value changed
    pub(crate) fn apply_digital_input(&mut self, port: u8, mask: u8) -> Result<u8> {
        if port >= self.total_ports {
            return Err(FirmataError::PortOutOfRange {
                port,
                total: self.total_ports,
            });
        }
        let inputs = self.port_inputs[port as usize];
        if mask & !inputs != 0 {
            return Err(FirmataError::PortMaskMismatch { port, mask, inputs });
        }

        let mut changed = 0u8;
        let start = port as usize * 8;
        for (i, pin) in self.pins_mut().iter_mut().skip(start).take(8).enumerate() {
            let bit = 1u8 << i;
            if inputs & bit == 0 {
                continue;
            }
            let value = u32::from(mask & bit != 0);
            if pin.value != value {
                pin.value = value;
                changed |= bit;
            }
        }
        Ok(changed)
    }

    /// Mirror a whole-port digital write; returns the mask of pins whose
    /// model changed
    ///
    /// OUTPUT pins take their bit as value and state. A high bit on an INPUT
    /// pin enables its pull-up, as it does on the board.
    pub(crate) fn apply_digital_output(&mut self, port: u8, values: u8) -> u8 {
        let mut changed = 0u8;
        let start = port as usize * 8;
        let mut pullups = Vec::new();

        for (i, pin) in self.pins_mut().iter_mut().skip(start).take(8).enumerate() {
            let bit = 1u8 << i;
            let value = u32::from(values & bit != 0);
            match pin.mode {
                PinMode::OUTPUT if pin.value != value => {
                    pin.value = value;
                    pin.state = value;
                    changed |= bit;
                }
                PinMode::INPUT if value == 1 && pin.state != 1 => {
                    pullups.push(pin.dx);
                    changed |= bit;
                }
                _ => {}
            }
        }

        for dx in pullups {
            self.apply_pin_mode(dx, PinMode::PULLUP);
        }
        changed
    }
}
