//! Protocol Module
//!
//! The Firmata wire format as seen from the host.
//!
//! ## Message Kinds
//!
//! ### Fixed-size Messages
//! ```text
//! ┌───────────────┬──────────┬──────────┐
//! │ Cmd|Chan (1)  │ LSB (1)  │ MSB (1)  │
//! └───────────────┴──────────┴──────────┘
//! ```
//! - 0xE0-0xEF: analog message, channel in the low nibble, 14-bit value
//! - 0x90-0x9F: digital port message, port in the low nibble, 8 pin levels
//! - 0xF9:      protocol version (major, minor)
//!
//! ### Sysex Messages
//! ```text
//! ┌──────┬─────────────┬───────────────────────────┬──────┐
//! │ 0xF0 │ Sub-cmd (1) │  Payload (7-bit bytes)    │ 0xF7 │
//! └──────┴─────────────┴───────────────────────────┴──────┘
//! ```
//!
//! Raw 8-bit data inside a sysex payload travels as 7-bit pairs (see `bits`).

pub mod bits;
pub mod constants;
mod frame;
mod reader;
mod writer;

pub use bits::{decode14, encode14};
pub use frame::{decode_message, decode_sysex, CapabilityResponse, Frame, I2cReply};
pub use reader::{FrameReader, MAX_SYSEX_SIZE};
pub use writer::FrameWriter;
