//! Observer hooks
//!
//! Hooks run on the engine loop thread with read-only access to the board.
//! They must not call back into the `Firmata` handle: the loop is busy
//! running the hook and the call would never be served.

use crate::board::{Board, Pin};
use crate::protocol::I2cReply;

pub type ConnectedHook = Box<dyn FnMut(&Board) + Send>;
pub type PinHook = Box<dyn FnMut(&Board, &Pin) + Send>;
/// Arguments: port, mask of changed pins, port values
pub type DigitalHook = Box<dyn FnMut(&Board, u8, u8, u8) + Send>;
pub type I2cHook = Box<dyn FnMut(&Board, &I2cReply) + Send>;
pub type BytesHook = Box<dyn FnMut(&Board, &[u8]) + Send>;

/// Observers for board events; every hook defaults to a no-op
pub struct Hooks {
    pub(crate) connected: ConnectedHook,
    pub(crate) analog_message: PinHook,
    pub(crate) digital_message: DigitalHook,
    pub(crate) pin_state: PinHook,
    pub(crate) i2c_reply: I2cHook,
    pub(crate) string_data: BytesHook,
    pub(crate) sysex: BytesHook,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            connected: Box::new(|_| {}),
            analog_message: Box::new(|_, _| {}),
            digital_message: Box::new(|_, _, _, _| {}),
            pin_state: Box::new(|_, _| {}),
            i2c_reply: Box::new(|_, _| {}),
            string_data: Box::new(|_, _| {}),
            sysex: Box::new(|_, _| {}),
        }
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fired once per handshake, when the pin names arrive
    pub fn on_connected(mut self, hook: impl FnMut(&Board) + Send + 'static) -> Self {
        self.connected = Box::new(hook);
        self
    }

    pub fn on_analog_message(mut self, hook: impl FnMut(&Board, &Pin) + Send + 'static) -> Self {
        self.analog_message = Box::new(hook);
        self
    }

    pub fn on_digital_message(
        mut self,
        hook: impl FnMut(&Board, u8, u8, u8) + Send + 'static,
    ) -> Self {
        self.digital_message = Box::new(hook);
        self
    }

    /// Only fired after the handshake
    pub fn on_pin_state(mut self, hook: impl FnMut(&Board, &Pin) + Send + 'static) -> Self {
        self.pin_state = Box::new(hook);
        self
    }

    pub fn on_i2c_reply(mut self, hook: impl FnMut(&Board, &I2cReply) + Send + 'static) -> Self {
        self.i2c_reply = Box::new(hook);
        self
    }

    pub fn on_string_data(mut self, hook: impl FnMut(&Board, &[u8]) + Send + 'static) -> Self {
        self.string_data = Box::new(hook);
        self
    }

    /// Unknown sysex; the payload starts with the sub-command
    pub fn on_sysex(mut self, hook: impl FnMut(&Board, &[u8]) + Send + 'static) -> Self {
        self.sysex = Box::new(hook);
        self
    }
}
