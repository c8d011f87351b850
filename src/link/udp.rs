//! Kernel UDP endpoint.
//!
//! Conventional UDP socket used for relay-forward traffic and for the
//! non-interface-scoped listener.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Bind a broadcast-capable UDP socket with address and port reuse,
/// optionally tied to one interface.
pub fn bind(address: Ipv4Addr, port: u16, device: Option<&str>) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_broadcast(true)?;

    #[cfg(target_os = "linux")]
    if let Some(name) = device {
        socket.bind_device(Some(name.as_bytes()))?;
    }
    #[cfg(not(target_os = "linux"))]
    let _ = device;

    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddrV4::new(address, port).into())?;
    UdpSocket::from_std(socket.into())
}
