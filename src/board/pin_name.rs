//! MCU pin names
//!
//! A pin name packs the MCU port in the high nibble and the pin index in the
//! low nibble: ports A..K take 0..10 and port Z takes 11, so PA0 = 0x00 and
//! PZ15 = 0xBF. Power and control pins follow PZ15.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FirmataError;

const PORT_Z: u8 = 11;
const LAST_GPIO: u8 = (PORT_Z << 4) | 0x0F;

/// Name of a physical MCU pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinName(pub u8);

impl PinName {
    pub const V3_3: PinName = PinName(LAST_GPIO + 1);
    pub const V5: PinName = PinName(LAST_GPIO + 2);
    pub const GND: PinName = PinName(LAST_GPIO + 3);
    pub const RESET: PinName = PinName(LAST_GPIO + 4);
    pub const VBAT: PinName = PinName(LAST_GPIO + 5);
    pub const NONE: PinName = PinName(LAST_GPIO + 6);

    /// Name not reported yet
    pub const UNKNOWN: PinName = PinName(0xFF);

    /// Build a GPIO name from its port letter ('A'..='K' or 'Z') and index
    pub fn gpio(port: char, index: u8) -> Option<PinName> {
        if index > 0x0F {
            return None;
        }
        let port = match port.to_ascii_uppercase() {
            'Z' => PORT_Z,
            p @ 'A'..='K' => p as u8 - b'A',
            _ => return None,
        };
        Some(PinName((port << 4) | index))
    }

    pub fn is_gpio(self) -> bool {
        self.0 <= LAST_GPIO
    }

    pub fn is_power_or_control(self) -> bool {
        self >= Self::V3_3 && self <= Self::NONE
    }

    pub fn is_unknown(self) -> bool {
        self > Self::NONE
    }

    fn port_letter(self) -> char {
        match self.0 >> 4 {
            PORT_Z => 'Z',
            port => (b'A' + port) as char,
        }
    }
}

impl fmt::Display for PinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_gpio() {
            return write!(f, "P{}{}", self.port_letter(), self.0 & 0x0F);
        }
        match *self {
            Self::V3_3 => f.write_str("3V3"),
            Self::V5 => f.write_str("5V"),
            Self::GND => f.write_str("GND"),
            Self::RESET => f.write_str("RESET"),
            Self::VBAT => f.write_str("VBAT"),
            Self::NONE => f.write_str("NONE"),
            PinName(raw) => write!(f, "P_0x{:x}", raw),
        }
    }
}

impl FromStr for PinName {
    type Err = FirmataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FirmataError::InvalidPinName(s.to_string());
        let mut chars = s.chars();
        if chars.next() != Some('P') {
            return Err(invalid());
        }
        let port = chars.next().ok_or_else(invalid)?;
        let index: u8 = chars.as_str().parse().map_err(|_| invalid())?;
        PinName::gpio(port, index)
            .filter(|_| port.is_ascii_uppercase())
            .ok_or_else(invalid)
    }
}
