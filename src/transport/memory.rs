//! In-memory transport
//!
//! A duplex pipe with a simulated device on the other end. The device end
//! feeds bytes to the engine and records every byte the engine writes.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use crossbeam::channel::{self, select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use super::{Close, Transport};

/// Engine side of an in-memory pipe
pub struct MemoryTransport {
    incoming: Receiver<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    closed_tx: Sender<()>,
    closed_rx: Receiver<()>,
}

/// Device side of an in-memory pipe
pub struct DeviceEnd {
    outgoing: Sender<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    closed_rx: Receiver<()>,
}

impl MemoryTransport {
    /// Create a connected pair
    pub fn pair() -> (MemoryTransport, DeviceEnd) {
        let (outgoing, incoming) = channel::unbounded();
        let (closed_tx, closed_rx) = channel::bounded(0);
        let written = Arc::new(Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));

        let device = DeviceEnd {
            outgoing,
            written: Arc::clone(&written),
            fail_writes: Arc::clone(&fail_writes),
            closed_rx: closed_rx.clone(),
        };
        let transport = MemoryTransport {
            incoming,
            written,
            fail_writes,
            closed_tx,
            closed_rx,
        };
        (transport, device)
    }
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;
    type Closer = MemoryCloser;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer, Self::Closer)> {
        let reader = MemoryReader {
            incoming: self.incoming,
            closed: self.closed_rx.clone(),
            pending: BytesMut::new(),
        };
        let writer = MemoryWriter {
            written: self.written,
            fail_writes: self.fail_writes,
            closed: self.closed_rx,
        };
        let closer = MemoryCloser {
            closed: Mutex::new(Some(self.closed_tx)),
        };
        Ok((reader, writer, closer))
    }
}

fn is_closed(closed: &Receiver<()>) -> bool {
    matches!(closed.try_recv(), Err(TryRecvError::Disconnected))
}

// =============================================================================
// Engine Side
// =============================================================================

pub struct MemoryReader {
    incoming: Receiver<Vec<u8>>,
    closed: Receiver<()>,
    pending: BytesMut,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            select! {
                recv(self.incoming) -> chunk => match chunk {
                    Ok(chunk) => self.pending.extend_from_slice(&chunk),
                    // Device end dropped
                    Err(_) => return Ok(0),
                },
                recv(self.closed) -> _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "transport closed",
                    ));
                }
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

pub struct MemoryWriter {
    written: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
    closed: Receiver<()>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if is_closed(&self.closed) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "write failure injected"));
        }
        self.written.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct MemoryCloser {
    closed: Mutex<Option<Sender<()>>>,
}

impl Close for MemoryCloser {
    fn close(&self) -> io::Result<()> {
        // Dropping the sender disconnects every `closed` receiver
        self.closed.lock().take();
        Ok(())
    }
}

// =============================================================================
// Device Side
// =============================================================================

impl DeviceEnd {
    /// Send bytes to the engine
    ///
    /// Bytes sent after the engine closed are dropped.
    pub fn send(&self, bytes: &[u8]) {
        let _ = self.outgoing.send(bytes.to_vec());
    }

    /// Everything the engine has written so far
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    /// Take and clear what the engine has written so far
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock())
    }

    /// Make every following engine write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Whether the engine closed the transport
    pub fn is_closed(&self) -> bool {
        is_closed(&self.closed_rx)
    }
}
