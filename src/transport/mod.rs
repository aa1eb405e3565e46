//! Byte transport over a serial line or a stream socket.
//!
//! The [`Transport`] owns the handle written to by the input side; the read
//! loop works on a [`TransportReader`] holding a duplicate of the same handle,
//! so a bounded wait for inbound data never blocks a writer.

mod serial;
mod socket;

pub use serial::FrameFormat;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::fmt;
use std::io;
use std::os::fd::BorrowedFd;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use serial::SerialLine;
use socket::SocketPort;

/// Size of the fixed receive buffer.
pub const READ_BUF_SIZE: usize = 512;
/// Floor for the receive wait, so a zero timeout still yields the CPU.
const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid frame format `{0}`")]
    InvalidFormat(String),

    #[error("no target given")]
    MissingTarget,

    #[error("cannot open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("no usable socket type for {target}")]
    NoRoute { target: String },

    #[error("remote side disconnected")]
    Disconnected,

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where the session connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Serial { device: String },
    Tcp { host: String, port: u16 },
    /// A leading NUL or a literal `\0` prefix selects the abstract namespace.
    Unix { path: String },
}

impl Endpoint {
    pub fn target(&self) -> &str {
        match self {
            Endpoint::Serial { device } => device,
            Endpoint::Tcp { host, .. } => host,
            Endpoint::Unix { path } => path,
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, Endpoint::Serial { .. })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Serial { device } => write!(f, "{}", device),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix { path } => write!(f, "{}", path.escape_default()),
        }
    }
}

enum Port {
    Serial(SerialLine),
    Socket(SocketPort),
}

impl Port {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Port::Serial(line) => line.as_fd(),
            Port::Socket(sock) => sock.as_fd(),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Port::Serial(line) => line.read(buf),
            Port::Socket(sock) => sock.read(buf),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Port::Serial(line) => line.write_all(data),
            Port::Socket(sock) => sock.write_all(data),
        }
    }

    fn try_clone(&self) -> io::Result<Port> {
        Ok(match self {
            Port::Serial(line) => Port::Serial(line.try_clone()?),
            Port::Socket(sock) => Port::Socket(sock.try_clone()?),
        })
    }

    /// A zero-length read on a stream means the peer went away.
    fn is_stream(&self) -> bool {
        match self {
            Port::Serial(_) => true,
            Port::Socket(sock) => sock.is_stream(),
        }
    }

    /// Serial lines keep reading until the line goes quiet; sockets take one read.
    fn accumulates(&self) -> bool {
        matches!(self, Port::Serial(_))
    }
}

/// The open connection for one session.
pub struct Transport {
    endpoint: Endpoint,
    port: Option<Port>,
    baud: u32,
    format: FrameFormat,
}

impl Transport {
    /// Open the endpoint named by `config`.
    pub fn open(config: &Config) -> Result<Self, TransportError> {
        let endpoint = config.endpoint.clone();
        if endpoint.target().is_empty() {
            return Err(TransportError::MissingTarget);
        }
        let (port, baud) = match &endpoint {
            Endpoint::Serial { device } => {
                let line = SerialLine::open(device, config.speed, config.format, config.timeout)?;
                let baud = line.baud_rate();
                if baud != config.speed {
                    warn!(requested = config.speed, actual = baud, "baud rate differs from request");
                }
                (Port::Serial(line), baud)
            }
            Endpoint::Tcp { host, port } => (Port::Socket(socket::connect_tcp(host, *port)?), 0),
            Endpoint::Unix { path } => (Port::Socket(socket::connect_unix(path)?), 0),
        };
        info!(endpoint = %endpoint, "transport open");
        Ok(Self::with_port(endpoint, port, baud, config.format))
    }

    fn with_port(endpoint: Endpoint, port: Port, baud: u32, format: FrameFormat) -> Self {
        Self {
            endpoint,
            port: Some(port),
            baud,
            format,
        }
    }

    /// Wrap an already connected Unix stream.
    #[cfg(test)]
    pub fn from_unix_stream(path: impl Into<String>, stream: std::os::unix::net::UnixStream) -> Self {
        Self::with_port(
            Endpoint::Unix { path: path.into() },
            Port::Socket(SocketPort::Unix(stream)),
            0,
            FrameFormat::default(),
        )
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Actual baud rate and frame format; `None` for sockets.
    pub fn line_settings(&self) -> Option<(u32, FrameFormat)> {
        self.endpoint.is_serial().then_some((self.baud, self.format))
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Disconnected)?;
        port.write_all(data)?;
        debug!(bytes = data.len(), "sent");
        Ok(())
    }

    /// A reader over a duplicate of the handle, for the read loop.
    pub fn split_reader(&self) -> Result<TransportReader, TransportError> {
        let port = self.port.as_ref().ok_or(TransportError::Disconnected)?;
        Ok(TransportReader {
            port: port.try_clone()?,
            buf: vec![0u8; READ_BUF_SIZE].into_boxed_slice(),
        })
    }

    /// Release the handle, restoring serial line settings. Safe to call twice.
    pub fn close(&mut self) {
        let Some(port) = self.port.take() else {
            return;
        };
        if let Port::Serial(mut line) = port {
            line.restore();
        }
        info!(endpoint = %self.endpoint, "transport closed");
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read side of a split [`Transport`].
pub struct TransportReader {
    port: Port,
    buf: Box<[u8]>,
}

impl TransportReader {
    /// Wait up to `timeout` (at least 1 ms) for data. An empty slice means
    /// nothing arrived.
    pub fn read(&mut self, timeout: Duration) -> Result<&[u8], TransportError> {
        let n = read_into(&mut self.port, &mut self.buf, timeout)?;
        Ok(&self.buf[..n])
    }
}

fn read_into(port: &mut Port, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
    let timeout = timeout.max(MIN_WAIT);
    if !wait_readable(port.as_fd(), timeout)? {
        return Ok(0);
    }
    let mut filled = 0;
    loop {
        match port.read(&mut buf[filled..]) {
            Ok(0) if port.is_stream() => return Err(TransportError::Disconnected),
            Ok(n) => filled += n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(e.into()),
        }
        if !port.accumulates() || filled == buf.len() || !wait_readable(port.as_fd(), timeout)? {
            break;
        }
    }
    Ok(filled)
}

/// Poll for input. Hangup without pending data counts as a disconnect.
fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> Result<bool, TransportError> {
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    // Clamp to u16::MAX milliseconds
    let timeout_ms = timeout.as_millis().min(u16::MAX as u128) as u16;
    match poll(&mut fds, PollTimeout::from(timeout_ms)) {
        Ok(0) => Ok(false),
        Ok(_) => {
            let revents = fds[0].revents().unwrap_or(PollFlags::empty());
            if revents.contains(PollFlags::POLLIN) {
                Ok(true)
            } else if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
                Err(TransportError::Disconnected)
            } else {
                Ok(false)
            }
        }
        Err(nix::errno::Errno::EINTR) => Ok(false),
        Err(e) => Err(TransportError::Io(e.into())),
    }
}
