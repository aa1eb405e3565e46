use nix::sys::socket::{connect, socket, AddressFamily, SockFlag, SockType, SockaddrIn, SockaddrLike, UnixAddr};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs, UdpSocket};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::net::{UnixDatagram, UnixStream};
use tracing::{debug, info};

use super::TransportError;

/// Socket types tried in order until one connects.
const SOCKET_TYPES: [SockType; 5] = [
    SockType::Stream,
    SockType::Raw,
    SockType::Rdm,
    SockType::SeqPacket,
    SockType::Datagram,
];

pub(super) enum SocketPort {
    Tcp(TcpStream),
    Udp(UdpSocket),
    Unix(UnixStream),
    UnixDatagram(UnixDatagram),
}

impl SocketPort {
    pub(super) fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            SocketPort::Tcp(s) => s.as_fd(),
            SocketPort::Udp(s) => s.as_fd(),
            SocketPort::Unix(s) => s.as_fd(),
            SocketPort::UnixDatagram(s) => s.as_fd(),
        }
    }

    pub(super) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SocketPort::Tcp(s) => s.read(buf),
            SocketPort::Udp(s) => s.recv(buf),
            SocketPort::Unix(s) => s.read(buf),
            SocketPort::UnixDatagram(s) => s.recv(buf),
        }
    }

    pub(super) fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            SocketPort::Tcp(s) => s.write_all(data),
            SocketPort::Unix(s) => s.write_all(data),
            SocketPort::Udp(s) => s.send(data).map(drop),
            SocketPort::UnixDatagram(s) => s.send(data).map(drop),
        }
    }

    pub(super) fn try_clone(&self) -> io::Result<Self> {
        Ok(match self {
            SocketPort::Tcp(s) => SocketPort::Tcp(s.try_clone()?),
            SocketPort::Udp(s) => SocketPort::Udp(s.try_clone()?),
            SocketPort::Unix(s) => SocketPort::Unix(s.try_clone()?),
            SocketPort::UnixDatagram(s) => SocketPort::UnixDatagram(s.try_clone()?),
        })
    }

    pub(super) fn is_stream(&self) -> bool {
        matches!(self, SocketPort::Tcp(_) | SocketPort::Unix(_))
    }
}

fn is_connection_oriented(kind: SockType) -> bool {
    matches!(kind, SockType::Stream | SockType::SeqPacket | SockType::Rdm)
}

fn try_connect(family: AddressFamily, kind: SockType, addr: &dyn SockaddrLike) -> nix::Result<OwnedFd> {
    let fd = socket(family, kind, SockFlag::empty(), None)?;
    connect(fd.as_raw_fd(), addr)?;
    Ok(fd)
}

/// Connect to an IPv4 host, trying each socket type in turn.
pub(super) fn connect_tcp(host: &str, port: u16) -> Result<SocketPort, TransportError> {
    let resolve_err = |source| TransportError::Resolve {
        host: host.to_string(),
        source,
    };
    let addrs: Vec<SocketAddrV4> = (host, port)
        .to_socket_addrs()
        .map_err(resolve_err)?
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .collect();
    if addrs.is_empty() {
        return Err(resolve_err(io::Error::new(
            io::ErrorKind::NotFound,
            "no IPv4 address",
        )));
    }

    for addr in addrs {
        let sockaddr = SockaddrIn::from(addr);
        for kind in SOCKET_TYPES {
            match try_connect(AddressFamily::Inet, kind, &sockaddr) {
                Ok(fd) => {
                    info!(%addr, ?kind, "socket connected");
                    return Ok(if is_connection_oriented(kind) {
                        SocketPort::Tcp(TcpStream::from(fd))
                    } else {
                        SocketPort::Udp(UdpSocket::from(fd))
                    });
                }
                Err(e) => debug!(%addr, ?kind, error = %e, "connect failed"),
            }
        }
    }
    Err(TransportError::NoRoute {
        target: format!("{}:{}", host, port),
    })
}

/// Connect to a Unix socket, trying each socket type in turn.
pub(super) fn connect_unix(path: &str) -> Result<SocketPort, TransportError> {
    let addr = unix_addr(path).map_err(|e| TransportError::Open {
        target: path.to_string(),
        source: e.into(),
    })?;
    for kind in SOCKET_TYPES {
        match try_connect(AddressFamily::Unix, kind, &addr) {
            Ok(fd) => {
                info!(path = %path.escape_default(), ?kind, "unix socket connected");
                return Ok(if is_connection_oriented(kind) {
                    SocketPort::Unix(UnixStream::from(fd))
                } else {
                    SocketPort::UnixDatagram(UnixDatagram::from(fd))
                });
            }
            Err(e) => debug!(?kind, error = %e, "unix connect failed"),
        }
    }
    Err(TransportError::NoRoute {
        target: path.escape_default().to_string(),
    })
}

/// The abstract-namespace name, if `path` asks for one.
fn abstract_name(path: &str) -> Option<&[u8]> {
    path.strip_prefix('\0')
        .or_else(|| path.strip_prefix("\\0"))
        .map(str::as_bytes)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn unix_addr(path: &str) -> nix::Result<UnixAddr> {
    match abstract_name(path) {
        Some(name) => UnixAddr::new_abstract(name),
        None => UnixAddr::new(path),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn unix_addr(path: &str) -> nix::Result<UnixAddr> {
    if abstract_name(path).is_some() {
        return Err(nix::errno::Errno::EAFNOSUPPORT);
    }
    UnixAddr::new(path)
}
