//! Engine Tests
//!
//! Session state machine with the Arduino Uno R3 fixtures, and the threaded
//! engine over an in-memory transport.

mod fixtures;
