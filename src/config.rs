//! Configuration for a Firmata connection
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Main configuration for one engine instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Sampling interval sent to the device before the handshake starts.
    /// Clamped to 14 bits on the wire.
    pub sampling_interval_ms: u32,

    // -------------------------------------------------------------------------
    // Handshake Configuration
    // -------------------------------------------------------------------------
    /// Deadline for the whole handshake (version → pin names)
    pub handshake_timeout: Duration,

    // -------------------------------------------------------------------------
    // Loop Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the queue carrying caller closures into the loop
    pub command_queue_capacity: usize,

    /// Capacity of the queue carrying decoded frames from the reader thread
    pub frame_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 500,
            handshake_timeout: Duration::from_secs(10),
            command_queue_capacity: 32,
            frame_queue_capacity: 32,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the sampling interval (in milliseconds)
    pub fn sampling_interval_ms(mut self, ms: u32) -> Self {
        self.config.sampling_interval_ms = ms;
        self
    }

    /// Set the handshake deadline
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Set the command queue capacity
    pub fn command_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.command_queue_capacity = capacity.max(1);
        self
    }

    /// Set the frame queue capacity
    pub fn frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.frame_queue_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
