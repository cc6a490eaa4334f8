//! # Firmata Host
//!
//! A host-side engine for the Firmata protocol:
//! - Frame codec for fixed-size and 7-bit-clean sysex messages
//! - Handshake state machine tolerant of duplicate and out-of-order replies
//! - Single-owner loop serializing every board update and caller command
//! - Pin, pin name and version model with serializable snapshots
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Firmata handle                          │
//! │                   (Any number of callers)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ jobs
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine loop                             │
//! │          (Session: board, frame writer, hooks)               │
//! └──────────▲──────────────────────────────────┬───────────────┘
//!            │ frames                           │
//!   ┌────────┴────────┐                 ┌───────▼───────┐
//!   │   FrameReader   │                 │  FrameWriter  │
//!   │ (reader thread) │                 │               │
//!   └────────▲────────┘                 └───────┬───────┘
//!            │                                  │
//!   ┌────────┴──────────────────────────────────▼───────┐
//!   │              Transport (TCP / memory)              │
//!   └───────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod board;
pub mod transport;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FirmataError, Result};
pub use config::Config;
pub use board::{Board, BoardSnapshot, Pin, PinMode, PinName, Stage, Version};
pub use engine::{Firmata, Hooks, Session};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
