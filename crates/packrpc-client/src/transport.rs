//! Transport contract and the blocking TCP implementation.

use packrpc_common::transport::{read_frame, write_frame};
use std::fmt;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default timeout for TCP connect, read, and write operations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the invocation engine needs from a transport: deliver one request
/// frame, block until one response frame is available.
///
/// No framing is assumed beyond "one response per request"; how frames are
/// delimited is the implementation's business. Errors are surfaced to the
/// caller as `client_send` / `client_receive` with the error's display text
/// as the message.
pub trait Transport {
    type Error: fmt::Display;

    /// Delivers one request frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Blocks until one response frame is available.
    fn receive(&mut self) -> Result<Vec<u8>, Self::Error>;
}

/// Blocking TCP transport speaking the length-prefixed frame protocol.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connects with the default timeout applied to connect, read, and
    /// write.
    ///
    /// The address may resolve to several socket addresses; each is tried
    /// until one accepts.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Self::connect_timeout(addr, DEFAULT_TIMEOUT)
    }

    /// Connects with an explicit timeout.
    pub fn connect_timeout(addr: impl ToSocketAddrs, timeout: Duration) -> io::Result<Self> {
        let mut last_err = None;
        for socket_addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&socket_addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    return Ok(Self { stream });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        }))
    }
}

impl Transport for TcpTransport {
    type Error = io::Error;

    fn send(&mut self, frame: &[u8]) -> Result<(), io::Error> {
        write_frame(&mut self.stream, frame)
    }

    fn receive(&mut self) -> Result<Vec<u8>, io::Error> {
        read_frame(&mut self.stream)
    }
}
