//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use serde::{Deserialize, Serialize};
use socket2::{Domain, SockRef, Socket, Type};
pub use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
pub use tokio::net::{TcpListener, TcpSocket, TcpStream, UdpSocket};

// Useful type definition.
type Result<T> = std::io::Result<T>;

// Addresses and ports of an established TCP connection.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct TcpConnInfo {
    pub local_addr: Ipv4Addr,
    pub local_port: u16,
    pub remote_addr: Ipv4Addr,
    pub remote_port: u16,
}

// Extension methods for UdpSocket.
pub trait UdpSocketExt {
    // Creates an IPv4 UDP socket bound to the given address with the
    // `SO_REUSEADDR` option set before binding.
    fn bind_reuseaddr_v4(addr: SocketAddrV4) -> Result<UdpSocket>;

    // Sets the value of the IP_MULTICAST_IF option for this socket.
    fn set_multicast_if_v4(&self, interface: &Ipv4Addr) -> Result<()>;
}

// Extension methods for TcpSocket.
pub trait TcpSocketExt {
    // Creates an IPv4 TCP socket with `SO_REUSEADDR` set.
    fn new_v4_reuseaddr() -> Result<TcpSocket>;
}

// Extension methods for TcpStream.
pub trait TcpStreamExt {
    // Returns the addresses and ports of this IPv4 connection.
    fn conn_info(&self) -> Result<TcpConnInfo>;
}

// ===== impl UdpSocket =====

impl UdpSocketExt for UdpSocket {
    fn bind_reuseaddr_v4(addr: SocketAddrV4) -> Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        socket.set_nonblocking(true)?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddr::V4(addr).into())?;
        UdpSocket::from_std(socket.into())
    }

    fn set_multicast_if_v4(&self, interface: &Ipv4Addr) -> Result<()> {
        SockRef::from(self).set_multicast_if_v4(interface)
    }
}

// ===== impl TcpSocket =====

impl TcpSocketExt for TcpSocket {
    fn new_v4_reuseaddr() -> Result<TcpSocket> {
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        Ok(socket)
    }
}

// ===== impl TcpStream =====

impl TcpStreamExt for TcpStream {
    fn conn_info(&self) -> Result<TcpConnInfo> {
        let (local, remote) = match (self.local_addr()?, self.peer_addr()?) {
            (SocketAddr::V4(local), SocketAddr::V4(remote)) => (local, remote),
            _ => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "non-IPv4 TCP connection",
                ));
            }
        };

        Ok(TcpConnInfo {
            local_addr: *local.ip(),
            local_port: local.port(),
            remote_addr: *remote.ip(),
            remote_port: remote.port(),
        })
    }
}
