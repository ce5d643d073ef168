//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

use lsr_utils::socket::{OwnedReadHalf, TcpListener, UdpSocket};
use lsr_utils::task::{IntervalTask, Task, TimeoutTask};
use lsr_utils::{Sender, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{Instrument, debug_span};

use crate::config::Config;
use crate::discovery;
use crate::network;

//
// LDP tasks diagram:
//
//         discovery_rx (1x) -> +--------------+ -> (Nx) iface_hello_interval
//          adj_timeout (Nx) -> |              |
//         tcp_listener (1x) -> |   instance   |
//          tcp_connect (Nx) -> |              |
//  nbr_backoff_timeout (Nx) -> |              |
//       session_closed (Nx) -> +--------------+
//                                     |
//                                     | (Nx) spawn
//                                     V
//           session_rx (1x) -> +--------------+
//   session_kalive_tx (1x) ->  |   session    |
//  session_hold_timeout (1x) -> +--------------+
//

// LDP inter-task message types.
pub mod messages {
    use std::net::Ipv4Addr;

    use lsr_utils::socket::{TcpConnInfo, TcpStream};

    use crate::error::Error;
    use crate::packet::StatusCode;
    use crate::packet::{DecodeError, Pdu};

    // Type aliases.
    pub type ProtocolInputMsg = input::ProtocolMsg;

    // Input messages (child task -> instance task).
    pub mod input {
        use super::*;

        #[derive(Debug)]
        pub enum ProtocolMsg {
            UdpRxPdu(UdpRxPduMsg),
            AdjTimeout(AdjTimeoutMsg),
            TcpAccept(TcpAcceptMsg),
            TcpConnect(TcpConnectMsg),
            NbrBackoffTimeout(NbrBackoffTimeoutMsg),
            SessionClosed(SessionClosedMsg),
        }

        #[derive(Debug)]
        pub struct UdpRxPduMsg {
            pub src_addr: Ipv4Addr,
            pub pdu: Result<Pdu, DecodeError>,
        }

        #[derive(Debug)]
        pub struct AdjTimeoutMsg {
            pub lsr_id: Ipv4Addr,
        }

        #[derive(Debug)]
        pub struct TcpAcceptMsg {
            pub stream: TcpStream,
            pub conn_info: TcpConnInfo,
        }

        #[derive(Debug)]
        pub struct TcpConnectMsg {
            pub lsr_id: Ipv4Addr,
            pub conn: Result<(TcpStream, TcpConnInfo), Error>,
        }

        #[derive(Debug)]
        pub struct NbrBackoffTimeoutMsg {
            pub lsr_id: Ipv4Addr,
        }

        #[derive(Debug)]
        pub struct SessionClosedMsg {
            pub lsr_id: Ipv4Addr,
        }
    }

    // Session messages (child task or instance task -> session task).
    #[derive(Debug)]
    pub enum SessionMsg {
        RxPdu(Result<Pdu, Error>),
        KeepaliveTick,
        HoldTimeout,
        Stop(StatusCode),
    }
}

// ===== LDP tasks =====

// UDP discovery Rx task.
pub(crate) fn discovery_rx(
    disc_socket: &Arc<UdpSocket>,
    udp_pdu_rxp: &Sender<messages::input::UdpRxPduMsg>,
) -> Task<()> {
    let span1 = debug_span!("discovery");
    let _span1_guard = span1.enter();
    let span2 = debug_span!("input");
    let _span2_guard = span2.enter();

    let disc_socket = disc_socket.clone();
    let udp_pdu_rxp = udp_pdu_rxp.clone();

    Task::spawn_supervised(move || {
        let disc_socket = disc_socket.clone();
        let udp_pdu_rxp = udp_pdu_rxp.clone();
        async move {
            let _ = network::udp::read_loop(disc_socket, udp_pdu_rxp).await;
        }
        .in_current_span()
    })
}

// Send periodic LDP link hello messages.
pub(crate) fn iface_hello_interval(
    iface_addr: Ipv4Addr,
    disc_socket: &Arc<UdpSocket>,
    disc_tx_lock: &Arc<Mutex<()>>,
    config: &Arc<Config>,
    msg_id: &Arc<AtomicU32>,
) -> IntervalTask {
    let span1 = debug_span!("interface", address = %iface_addr);
    let _span1_guard = span1.enter();
    let span2 = debug_span!("discovery");
    let _span2_guard = span2.enter();
    let span3 = debug_span!("output");
    let _span3_guard = span3.enter();

    let disc_socket = disc_socket.clone();
    let disc_tx_lock = disc_tx_lock.clone();
    let config = config.clone();
    let msg_id = msg_id.clone();

    IntervalTask::new(
        Duration::from_secs(config.hello_interval.into()),
        true,
        move || {
            let disc_socket = disc_socket.clone();
            let disc_tx_lock = disc_tx_lock.clone();
            let config = config.clone();
            let msg_id = msg_id.clone();

            async move {
                discovery::send_hello(
                    &disc_socket,
                    &disc_tx_lock,
                    iface_addr,
                    &config,
                    &msg_id,
                )
                .await;
            }
            .in_current_span()
        },
    )
}

// Hello adjacency timeout task.
pub(crate) fn adj_timeout(
    lsr_id: Ipv4Addr,
    holdtime: Duration,
    adj_timeoutp: &Sender<messages::input::AdjTimeoutMsg>,
) -> TimeoutTask {
    let adj_timeoutp = adj_timeoutp.clone();
    TimeoutTask::new(holdtime, move || async move {
        let msg = messages::input::AdjTimeoutMsg { lsr_id };
        let _ = adj_timeoutp.send(msg).await;
    })
}

// TCP listening task.
pub(crate) fn tcp_listener(
    session_socket: &Arc<TcpListener>,
    tcp_acceptp: &Sender<messages::input::TcpAcceptMsg>,
) -> Task<()> {
    let span1 = debug_span!("session");
    let _span1_guard = span1.enter();
    let span2 = debug_span!("input");
    let _span2_guard = span2.enter();

    let session_socket = session_socket.clone();
    let tcp_acceptp = tcp_acceptp.clone();
    Task::spawn(
        async move {
            let _ =
                network::tcp::listen_loop(session_socket, tcp_acceptp).await;
        }
        .in_current_span(),
    )
}

// TCP connect task.
//
// Makes a single connection attempt. Retries are scheduled by the instance
// once the outcome is reported back.
pub(crate) fn tcp_connect(
    lsr_id: Ipv4Addr,
    remote_addr: Ipv4Addr,
    config: &Config,
    tcp_connectp: &Sender<messages::input::TcpConnectMsg>,
) -> Task<()> {
    let span = debug_span!("peer", %lsr_id);
    let _span_guard = span.enter();

    let local_addr = config.transport_address();
    let port = config.ldp_port;
    let timeout = config.tcp_connect_timeout();
    let tcp_connectp = tcp_connectp.clone();
    Task::spawn(
        async move {
            let conn = network::tcp::connect(
                lsr_id,
                local_addr,
                remote_addr,
                port,
                timeout,
            )
            .await;

            // Send message to the parent LDP task.
            let msg = messages::input::TcpConnectMsg { lsr_id, conn };
            let _ = tcp_connectp.send(msg).await;
        }
        .in_current_span(),
    )
}

// Session initialization backoff timeout task.
pub(crate) fn nbr_backoff_timeout(
    lsr_id: Ipv4Addr,
    timeout: Duration,
    nbr_backoff_timeoutp: &Sender<messages::input::NbrBackoffTimeoutMsg>,
) -> TimeoutTask {
    let nbr_backoff_timeoutp = nbr_backoff_timeoutp.clone();
    TimeoutTask::new(timeout, move || async move {
        let msg = messages::input::NbrBackoffTimeoutMsg { lsr_id };
        let _ = nbr_backoff_timeoutp.send(msg).await;
    })
}

// Session TCP Rx task.
pub(crate) fn session_rx(
    stream: OwnedReadHalf,
    lsr_id: Ipv4Addr,
    raddr: Ipv4Addr,
    session_msgp: &UnboundedSender<messages::SessionMsg>,
) -> Task<()> {
    let span = debug_span!("input");
    let _span_guard = span.enter();

    let session_msgp = session_msgp.clone();
    Task::spawn(
        async move {
            let _ = network::tcp::read_loop(stream, lsr_id, raddr, session_msgp)
                .await;
        }
        .in_current_span(),
    )
}

// Send periodic keepalive messages.
pub(crate) fn session_kalive_interval(
    interval: u16,
    session_msgp: &UnboundedSender<messages::SessionMsg>,
) -> IntervalTask {
    let session_msgp = session_msgp.clone();
    IntervalTask::new(
        Duration::from_secs(interval.into()),
        false,
        move || {
            let session_msgp = session_msgp.clone();
            async move {
                let _ = session_msgp.send(messages::SessionMsg::KeepaliveTick);
            }
        },
    )
}

// Session hold timeout task.
pub(crate) fn session_hold_timeout(
    holdtime: u16,
    session_msgp: &UnboundedSender<messages::SessionMsg>,
) -> TimeoutTask {
    let session_msgp = session_msgp.clone();
    TimeoutTask::new(
        Duration::from_secs(holdtime.into()),
        move || async move {
            let _ = session_msgp.send(messages::SessionMsg::HoldTimeout);
        },
    )
}
