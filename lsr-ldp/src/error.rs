//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use tracing::{error, warn, warn_span};

use crate::config::ConfigError;
use crate::packet::StatusCode;
use crate::packet::error::DecodeError;
use crate::session::fsm;

// Control plane errors.
#[derive(Debug)]
pub enum Error {
    IoError(IoError),
    // Lifecycle
    AlreadyStarted,
    NotStarted,
    Config(ConfigError),
    StartFailed(Box<Error>),
    // Discovery
    HelloBadSource(Ipv4Addr),
    HelloDecode(DecodeError),
    // Peer transport
    Connect(Ipv4Addr, std::io::Error),
    ConnectTimeout(Ipv4Addr),
    PeerClosed(Ipv4Addr),
    UnexpectedConn(Ipv4Addr),
    DuplicateConn(Ipv4Addr),
    // Session engine
    PeerDecode(Ipv4Addr, DecodeError),
    NotificationRcvd(Ipv4Addr, Option<StatusCode>),
    NotificationSent(Ipv4Addr, StatusCode),
    FsmUnexpectedEvent(Ipv4Addr, fsm::State, fsm::Event),
}

// Socket failures, named after the operation that failed.
#[derive(Debug)]
pub enum IoError {
    UdpSocket(std::io::Error),
    UdpMulticastJoin(std::io::Error),
    UdpRecv(std::io::Error),
    UdpSend(std::io::Error),
    TcpSocket(std::io::Error),
    TcpAccept(std::io::Error),
    TcpConnInfo(std::io::Error),
    TcpRecv(std::io::Error),
    TcpSend(std::io::Error),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        let Some(lsr_id) = self.peer() else {
            match self {
                Error::IoError(error) => error.log(),
                Error::Config(_) | Error::StartFailed(_) => {
                    error!(error = %with_source(self), "{}", self);
                }
                Error::HelloBadSource(addr) => {
                    warn!(source = %addr, "{}", self);
                }
                Error::HelloDecode(error) => {
                    warn!(error = %with_source(error), "{}", self);
                }
                _ => warn!("{}", self),
            }
            return;
        };

        warn_span!("peer", %lsr_id).in_scope(|| match self {
            Error::Connect(_, error) => {
                warn!(error = %with_source(error), "{}", self);
            }
            Error::PeerDecode(_, error) => {
                warn!(error = %with_source(error), "{}", self);
            }
            Error::NotificationRcvd(_, status) => {
                warn!(?status, "{}", self);
            }
            Error::NotificationSent(_, status) => {
                warn!(%status, "{}", self);
            }
            Error::FsmUnexpectedEvent(_, state, event) => {
                warn_span!("fsm").in_scope(|| {
                    warn!(?state, ?event, "{}", self);
                });
            }
            _ => warn!("{}", self),
        });
    }

    // LSR-ID of the peer the error concerns, if any.
    fn peer(&self) -> Option<Ipv4Addr> {
        match self {
            Error::Connect(lsr_id, _)
            | Error::ConnectTimeout(lsr_id)
            | Error::PeerClosed(lsr_id)
            | Error::UnexpectedConn(lsr_id)
            | Error::DuplicateConn(lsr_id)
            | Error::PeerDecode(lsr_id, _)
            | Error::NotificationRcvd(lsr_id, _)
            | Error::NotificationSent(lsr_id, _)
            | Error::FsmUnexpectedEvent(lsr_id, ..) => Some(*lsr_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Error::IoError(error) => return error.fmt(f),
            Error::AlreadyStarted => "control plane is already running",
            Error::NotStarted => "control plane is not running",
            Error::Config(..) => "configuration rejected",
            Error::StartFailed(..) => "control plane failed to start",
            Error::HelloBadSource(..) => "Hello from an unusable source",
            Error::HelloDecode(..) => "dropping undecodable Hello PDU",
            Error::Connect(..) => "transport connection to peer failed",
            Error::ConnectTimeout(..) => "transport connection timed out",
            Error::PeerClosed(..) => "peer closed the transport connection",
            Error::UnexpectedConn(..) => {
                "connection from a peer that should accept instead"
            }
            Error::DuplicateConn(..) => "peer already has a connection",
            Error::PeerDecode(..) => "undecodable PDU from peer",
            Error::NotificationRcvd(..) => "peer sent a fatal Notification",
            Error::NotificationSent(..) => "sent a fatal Notification",
            Error::FsmUnexpectedEvent(..) => "event not valid in this state",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(error) => Some(error),
            Error::Config(error) => Some(error),
            Error::StartFailed(error) => Some(error),
            Error::HelloDecode(error) | Error::PeerDecode(_, error) => {
                Some(error)
            }
            Error::Connect(_, error) => Some(error),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Error {
        Error::Config(error)
    }
}

// ===== impl IoError =====

impl IoError {
    pub fn log(&self) {
        warn!(error = %with_source(self), "{}", self);
    }

    fn inner(&self) -> &std::io::Error {
        match self {
            IoError::UdpSocket(error)
            | IoError::UdpMulticastJoin(error)
            | IoError::UdpRecv(error)
            | IoError::UdpSend(error)
            | IoError::TcpSocket(error)
            | IoError::TcpAccept(error)
            | IoError::TcpConnInfo(error)
            | IoError::TcpRecv(error)
            | IoError::TcpSend(error) => error,
        }
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            IoError::UdpSocket(..) => "open the discovery socket",
            IoError::UdpMulticastJoin(..) => "join the all-routers group",
            IoError::UdpRecv(..) => "receive a Hello datagram",
            IoError::UdpSend(..) => "send a Hello datagram",
            IoError::TcpSocket(..) => "open a transport socket",
            IoError::TcpAccept(..) => "accept a transport connection",
            IoError::TcpConnInfo(..) => "read the connection endpoints",
            IoError::TcpRecv(..) => "read from the transport connection",
            IoError::TcpSend(..) => "write to the transport connection",
        };
        write!(f, "couldn't {op}")
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner())
    }
}

// ===== global functions =====

// Flattens the source chain into a single line.
fn with_source<E: std::error::Error + ?Sized>(error: &E) -> String {
    match error.source() {
        Some(source) => format!("{error}: {}", with_source(source)),
        None => error.to_string(),
    }
}
