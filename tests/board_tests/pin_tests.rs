//! Pin Tests

use std::collections::BTreeMap;

use firmata::board::NOT_ANALOG;
use firmata::{FirmataError, Pin, PinMode, PinName};

// =============================================================================
// Pin Modes
// =============================================================================

#[test]
fn test_pin_mode_names() {
    assert_eq!(PinMode::INPUT.name(), "INPUT");
    assert_eq!(PinMode::INPUT.short_name(), "I");
    assert_eq!(PinMode::PULLUP.short_name(), "PU");
    assert_eq!(PinMode::FREQUENCY.name(), "FREQUENCY");
    assert_eq!(PinMode::IGNORE.name(), "IGNORE");
    assert_eq!(PinMode::IGNORE.short_name(), "X");
    assert_eq!(PinMode(0x42).name(), "M_0x42?");
    assert_eq!(PinMode::SERVO.to_string(), "SERVO");
}

#[test]
fn test_pin_mode_parse() {
    assert_eq!("OUTPUT".parse::<PinMode>().unwrap(), PinMode::OUTPUT);
    assert_eq!("pwm".parse::<PinMode>().unwrap(), PinMode::PWM);
    assert_eq!("IxO".parse::<PinMode>().unwrap(), PinMode::SHIFT);
    assert_eq!("I2C".parse::<PinMode>().unwrap(), PinMode::I2C);
    assert_eq!("ignore".parse::<PinMode>().unwrap(), PinMode::IGNORE);
    assert_eq!("0x0b".parse::<PinMode>().unwrap(), PinMode::PULLUP);
    assert_eq!("3".parse::<PinMode>().unwrap(), PinMode::PWM);
    assert!(matches!(
        "blink".parse::<PinMode>(),
        Err(FirmataError::InvalidPinMode(_))
    ));
}

#[test]
fn test_analog_output_modes() {
    assert!(PinMode::PWM.is_analog_output());
    assert!(PinMode::SERVO.is_analog_output());
    assert!(!PinMode::OUTPUT.is_analog_output());
    assert!(!PinMode::ANALOG.is_analog_output());
}

// =============================================================================
// Pin Names
// =============================================================================

#[test]
fn test_gpio_names() {
    assert_eq!(PinName(0x00).to_string(), "PA0");
    assert_eq!(PinName(0x1F).to_string(), "PB15");
    assert_eq!(PinName(0xAF).to_string(), "PK15");
    assert_eq!(PinName(0xB3).to_string(), "PZ3");
    assert!(PinName(0xBF).is_gpio());
}

#[test]
fn test_power_and_control_names() {
    assert_eq!(PinName::V3_3.to_string(), "3V3");
    assert_eq!(PinName::V5.to_string(), "5V");
    assert_eq!(PinName::GND.to_string(), "GND");
    assert_eq!(PinName::RESET.to_string(), "RESET");
    assert_eq!(PinName::VBAT.to_string(), "VBAT");
    assert_eq!(PinName::NONE.to_string(), "NONE");
    assert!(PinName::GND.is_power_or_control());
    assert!(!PinName::GND.is_gpio());
}

#[test]
fn test_unknown_names() {
    assert_eq!(PinName(0xC6).to_string(), "P_0xc6");
    assert_eq!(PinName::UNKNOWN.to_string(), "P_0xff");
    assert!(PinName(0xC6).is_unknown());
    assert!(!PinName::NONE.is_unknown());
}

#[test]
fn test_gpio_constructor() {
    assert_eq!(PinName::gpio('C', 13), Some(PinName(0x2D)));
    assert_eq!(PinName::gpio('z', 0), Some(PinName(0xB0)));
    assert_eq!(PinName::gpio('L', 0), None);
    assert_eq!(PinName::gpio('A', 16), None);
}

#[test]
fn test_pin_name_parse() {
    assert_eq!("PA15".parse::<PinName>().unwrap(), PinName(0x0F));
    assert_eq!("PZ2".parse::<PinName>().unwrap(), PinName(0xB2));
    for bad in ["", "PA", "pa1", "Pa1", "PA16", "PL1", "QA1", "3V3"] {
        assert!(
            matches!(bad.parse::<PinName>(), Err(FirmataError::InvalidPinName(_))),
            "{:?} parsed",
            bad
        );
    }
}

// =============================================================================
// Pins
// =============================================================================

#[test]
fn test_new_pin_defaults() {
    let mut modes = BTreeMap::new();
    modes.insert(PinMode::INPUT, 1);
    modes.insert(PinMode::PWM, 8);
    let pin = Pin::new(3, modes);

    assert_eq!(pin.ax, NOT_ANALOG);
    assert_eq!(pin.name, PinName::UNKNOWN);
    assert_eq!(pin.mode, PinMode::OUTPUT);
    assert!(!pin.is_analog());
    assert!(pin.supports(PinMode::PWM));
    assert!(!pin.supports(PinMode::SERVO));
    assert_eq!(pin.resolution(PinMode::PWM), Some(8));
    assert_eq!(pin.resolution(PinMode::SERVO), None);
}

#[test]
fn test_pin_is_input() {
    let mut pin = Pin::new(2, BTreeMap::new());
    assert!(!pin.is_input());
    pin.mode = PinMode::INPUT;
    assert!(pin.is_input());
    pin.mode = PinMode::PULLUP;
    assert!(pin.is_input());
}
