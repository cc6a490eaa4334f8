//! TCP transport
//!
//! For boards behind a network bridge (ESP-based firmware, ser2net, ...).

use std::io::{self, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{Close, Transport};

/// A connected TCP stream
pub struct TcpTransport {
    stream: TcpStream,
    peer_addr: String,
}

impl TcpTransport {
    /// Connect to the first address that accepts within `timeout`
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> io::Result<Self> {
        let mut last_error = None;
        for addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Self::from_stream(stream),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address to connect to")
        }))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        // Disable Nagle's algorithm: frames are a few bytes each
        stream.set_nodelay(true)?;
        let peer_addr = stream
            .peer_addr()
            .map(|a: SocketAddr| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Ok(Self { stream, peer_addr })
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Transport for TcpTransport {
    type Reader = TcpStream;
    type Writer = BufWriter<TcpStream>;
    type Closer = TcpCloser;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer, Self::Closer)> {
        let reader = self.stream.try_clone()?;
        let closer = TcpCloser {
            stream: self.stream.try_clone()?,
            peer_addr: self.peer_addr,
        };
        Ok((reader, BufWriter::new(self.stream), closer))
    }
}

/// Shuts both directions down, which wakes the reading thread
pub struct TcpCloser {
    stream: TcpStream,
    peer_addr: String,
}

impl Close for TcpCloser {
    fn close(&self) -> io::Result<()> {
        tracing::debug!("Closing connection to {}", self.peer_addr);
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
