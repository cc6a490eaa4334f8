//! Transport Module
//!
//! The byte stream between host and board. A transport splits into three
//! parts that live on different threads:
//!
//! - **Reader**: owned by the reading thread, blocks on input
//! - **Writer**: owned by the engine loop
//! - **Closer**: shared; `close` must unblock a reader stuck in `read`

pub mod memory;
pub mod tcp;

use std::io::{self, Read, Write};

pub use memory::{DeviceEnd, MemoryTransport};
pub use tcp::TcpTransport;

/// Shuts a transport down from any thread
pub trait Close: Send + Sync {
    fn close(&self) -> io::Result<()>;
}

/// A duplex byte stream the engine can drive
pub trait Transport: Send + 'static {
    type Reader: Read + Send + 'static;
    type Writer: Write + Send + 'static;
    type Closer: Close + 'static;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer, Self::Closer)>;
}
