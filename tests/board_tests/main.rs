//! Board Tests
//!
//! Pin modes, pin names and version compatibility.

mod pin_tests;
mod version_tests;
