//! Pin and pin mode definitions

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PinName;
use crate::error::FirmataError;

/// Analog index of a pin that cannot sample analog input
pub const NOT_ANALOG: u8 = 0x7F;

// =============================================================================
// Pin Mode
// =============================================================================

/// A Firmata pin mode byte
///
/// Modes outside the known table are kept as-is so that firmware extensions
/// survive a round trip through the board model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinMode(pub u8);

impl PinMode {
    pub const INPUT: PinMode = PinMode(0x00);
    pub const OUTPUT: PinMode = PinMode(0x01);
    pub const ANALOG: PinMode = PinMode(0x02);
    pub const PWM: PinMode = PinMode(0x03);
    pub const SERVO: PinMode = PinMode(0x04);
    pub const SHIFT: PinMode = PinMode(0x05);
    pub const I2C: PinMode = PinMode(0x06);
    pub const ONEWIRE: PinMode = PinMode(0x07);
    pub const STEPPER: PinMode = PinMode(0x08);
    pub const ENCODER: PinMode = PinMode(0x09);
    pub const SERIAL: PinMode = PinMode(0x0A);
    pub const PULLUP: PinMode = PinMode(0x0B);
    pub const SPI: PinMode = PinMode(0x0C);
    pub const SONAR: PinMode = PinMode(0x0D);
    pub const TONE: PinMode = PinMode(0x0E);
    pub const DHT: PinMode = PinMode(0x0F);
    pub const FREQUENCY: PinMode = PinMode(0x10);
    pub const IGNORE: PinMode = PinMode(0x7F);

    const NAMES: [(&'static str, &'static str); 17] = [
        ("I", "INPUT"),
        ("O", "OUTPUT"),
        ("A", "ANALOG"),
        ("PWM", "PWM"),
        ("SERVO", "SERVO"),
        ("IxO", "SHIFT"),
        ("I2C", "I2C"),
        ("W1", "ONEWIRE"),
        ("SM", "STEPPER"),
        ("RE", "ENCODER"),
        ("UART", "SERIAL"),
        ("PU", "PULLUP"),
        ("SPI", "SPI"),
        ("SONAR", "SONAR"),
        ("TONE", "TONE"),
        ("DHT", "DHT"),
        ("FREQ", "FREQUENCY"),
    ];

    /// Compact form used in pin tables ("I", "O", "PWM", ...)
    pub fn short_name(self) -> String {
        match self {
            PinMode::IGNORE => "X".to_string(),
            PinMode(m) => match Self::NAMES.get(m as usize) {
                Some((short, _)) => short.to_string(),
                None => Self::unknown_name(m),
            },
        }
    }

    /// Full form ("INPUT", "OUTPUT", ...)
    pub fn name(self) -> String {
        match self {
            PinMode::IGNORE => "IGNORE".to_string(),
            PinMode(m) => match Self::NAMES.get(m as usize) {
                Some((_, long)) => long.to_string(),
                None => Self::unknown_name(m),
            },
        }
    }

    fn unknown_name(mode: u8) -> String {
        format!("M_0x{:x}?", mode)
    }

    /// Modes whose value is written with an analog message
    pub fn is_analog_output(self) -> bool {
        matches!(self, PinMode::PWM | PinMode::SERVO)
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for PinMode {
    type Err = FirmataError;

    /// Accepts the long or short name (case-insensitive) or a numeric mode
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "IGNORE" | "X" => return Ok(PinMode::IGNORE),
            _ => {}
        }
        if let Some(index) = Self::NAMES.iter().position(|(short, long)| {
            upper == short.to_ascii_uppercase() || upper == *long
        }) {
            return Ok(PinMode(index as u8));
        }
        let parsed = match upper.strip_prefix("0X") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => upper.parse::<u8>(),
        };
        parsed
            .map(PinMode)
            .map_err(|_| FirmataError::InvalidPinMode(s.to_string()))
    }
}

// =============================================================================
// Pin
// =============================================================================

/// One physical pin as reported by the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Digital index, assigned in capability order
    pub dx: u8,

    /// Analog channel, or NOT_ANALOG
    pub ax: u8,

    /// MCU pin name from the name exchange
    pub name: PinName,

    /// Supported modes and their resolution in bits
    pub modes: BTreeMap<PinMode, u8>,

    /// Current mode
    pub mode: PinMode,

    /// Last written or reported value
    pub value: u32,

    /// Logical state; differs from value for pull-up inputs
    pub state: u32,
}

impl Pin {
    /// Create a pin as discovered by the capability response
    pub fn new(dx: u8, modes: BTreeMap<PinMode, u8>) -> Self {
        Self {
            dx,
            ax: NOT_ANALOG,
            name: PinName::UNKNOWN,
            modes,
            mode: PinMode::OUTPUT,
            value: 0,
            state: 0,
        }
    }

    pub fn supports(&self, mode: PinMode) -> bool {
        self.modes.contains_key(&mode)
    }

    /// Resolution in bits for a supported mode
    pub fn resolution(&self, mode: PinMode) -> Option<u8> {
        self.modes.get(&mode).copied()
    }

    pub fn is_analog(&self) -> bool {
        self.ax != NOT_ANALOG
    }

    /// Whether the pin reports into its digital port's input mask
    pub fn is_input(&self) -> bool {
        self.mode == PinMode::INPUT || self.mode == PinMode::PULLUP
    }
}
