//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use lsr_utils::socket::TcpListener;
use lsr_utils::task::Task;
use lsr_utils::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{Instrument, debug_span};

use crate::config::Config;
use crate::debug::Debug;
use crate::discovery::Discovery;
use crate::error::{Error, IoError};
use crate::events;
use crate::network::tcp;
use crate::packet::StatusCode;
use crate::registry::{PeerInfo, SharedRegistry};
use crate::tasks;
use crate::tasks::messages::ProtocolInputMsg;
use crate::tasks::messages::input::{
    AdjTimeoutMsg, NbrBackoffTimeoutMsg, SessionClosedMsg, TcpAcceptMsg,
    TcpConnectMsg, UdpRxPduMsg,
};

// LDP instance.
//
// Owns at most one running protocol instance at a time.
#[derive(Debug, Default)]
pub struct Instance {
    running: Option<RunningInstance>,
}

#[derive(Debug)]
struct RunningInstance {
    handle: InstanceHandle,
    shutdown_tx: oneshot::Sender<()>,
    task: Task<()>,
}

// Handle to a running instance, used to observe its peers.
#[derive(Clone, Debug)]
pub struct InstanceHandle {
    router_id: Ipv4Addr,
    registry: SharedRegistry,
    peer_eventp: broadcast::Sender<PeerEvent>,
}

// Peer lifecycle notifications, carrying the peer's LSR-ID.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PeerEvent {
    Up(Ipv4Addr),
    Down(Ipv4Addr),
}

// State of a running instance, owned by the instance task.
#[derive(Debug)]
pub struct InstanceState {
    pub(crate) config: Arc<Config>,
    pub(crate) router_id: Ipv4Addr,
    // Global message ID.
    pub(crate) msg_id: Arc<AtomicU32>,
    pub(crate) registry: SharedRegistry,
    pub(crate) tx: ProtocolInputChannelsTx,
    pub(crate) peer_eventp: broadcast::Sender<PeerEvent>,
    discovery: Discovery,
    _session_socket: Arc<TcpListener>,
    tcp_listener_task: Task<()>,
}

#[derive(Clone, Debug)]
pub struct ProtocolInputChannelsTx {
    // UDP Rx event.
    pub udp_pdu_rx: Sender<UdpRxPduMsg>,
    // Hello adjacency timeout.
    pub adj_timeout: Sender<AdjTimeoutMsg>,
    // TCP accept event.
    pub tcp_accept: Sender<TcpAcceptMsg>,
    // TCP connect event.
    pub tcp_connect: Sender<TcpConnectMsg>,
    // Peer initialization backoff timeout.
    pub nbr_backoff_timeout: Sender<NbrBackoffTimeoutMsg>,
    // Session closed.
    pub session_closed: Sender<SessionClosedMsg>,
}

#[derive(Debug)]
pub struct ProtocolInputChannelsRx {
    udp_pdu_rx: Receiver<UdpRxPduMsg>,
    adj_timeout: Receiver<AdjTimeoutMsg>,
    tcp_accept: Receiver<TcpAcceptMsg>,
    tcp_connect: Receiver<TcpConnectMsg>,
    nbr_backoff_timeout: Receiver<NbrBackoffTimeoutMsg>,
    session_closed: Receiver<SessionClosedMsg>,
}

// ===== impl Instance =====

impl Instance {
    const PEER_EVENT_CAPACITY: usize = 64;

    pub fn new() -> Instance {
        Default::default()
    }

    // Starts the instance with the given configuration.
    //
    // Fails if the instance is already running, if the configuration is
    // invalid or if the discovery and session sockets can't be set up.
    pub async fn start(
        &mut self,
        config: Config,
    ) -> Result<InstanceHandle, Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyStarted);
        }
        config.validate()?;

        let router_id = config.router_id();
        let config = Arc::new(config);
        let span = debug_span!("ldp-instance", %router_id);

        let (tx, rx) = protocol_input_channels();
        let (peer_eventp, _) = broadcast::channel(Self::PEER_EVENT_CAPACITY);
        let registry = SharedRegistry::default();
        let state = span
            .in_scope(|| {
                Debug::InstanceStart.log();
                InstanceState::new(&config, &registry, &peer_eventp, tx)
            })
            .map_err(|error| Error::StartFailed(Box::new(error)))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = Task::spawn(state.run(rx, shutdown_rx).instrument(span));

        let handle = InstanceHandle {
            router_id,
            registry,
            peer_eventp,
        };
        self.running = Some(RunningInstance {
            handle: handle.clone(),
            shutdown_tx,
            task,
        });

        Ok(handle)
    }

    // Stops the instance, closing all sessions with a Shutdown notification.
    pub async fn stop(&mut self) -> Result<(), Error> {
        let running = self.running.take().ok_or(Error::NotStarted)?;
        let _ = running.shutdown_tx.send(());
        let _ = running.task.await;
        Ok(())
    }

    pub fn handle(&self) -> Option<&InstanceHandle> {
        self.running.as_ref().map(|running| &running.handle)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

// ===== impl InstanceHandle =====

impl InstanceHandle {
    pub fn router_id(&self) -> Ipv4Addr {
        self.router_id
    }

    // Subscribes to peer up/down notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.peer_eventp.subscribe()
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        self.registry.lock().iter().map(|peer| peer.info()).collect()
    }

    pub fn peer(&self, lsr_id: Ipv4Addr) -> Option<PeerInfo> {
        self.registry.lock().get(&lsr_id).map(|peer| peer.info())
    }
}

// ===== impl InstanceState =====

impl InstanceState {
    fn new(
        config: &Arc<Config>,
        registry: &SharedRegistry,
        peer_eventp: &broadcast::Sender<PeerEvent>,
        tx: ProtocolInputChannelsTx,
    ) -> Result<InstanceState, Error> {
        let msg_id = Arc::new(AtomicU32::new(0));

        // Create TCP listening socket.
        let session_socket =
            tcp::listen_socket(config.transport_address(), config.ldp_port)
                .map(Arc::new)
                .map_err(IoError::TcpSocket)?;

        // Start discovery and TCP listener tasks.
        let discovery = Discovery::start(config, &msg_id, &tx.udp_pdu_rx)?;
        let tcp_listener_task =
            tasks::tcp_listener(&session_socket, &tx.tcp_accept);

        Ok(InstanceState {
            config: config.clone(),
            router_id: config.router_id(),
            msg_id,
            registry: registry.clone(),
            tx,
            peer_eventp: peer_eventp.clone(),
            discovery,
            _session_socket: session_socket,
            tcp_listener_task,
        })
    }

    async fn run(
        self,
        mut rx: ProtocolInputChannelsRx,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                // Stop requested or instance dropped.
                _ = &mut shutdown_rx => break,
                Some(msg) = rx.recv() => self.process_protocol_msg(msg),
            }
        }

        // Sessions reporting their closure must not block on a channel that
        // is no longer read.
        drop(rx);
        self.shutdown().await;
    }

    fn process_protocol_msg(&self, msg: ProtocolInputMsg) {
        match msg {
            // Received UDP discovery PDU.
            ProtocolInputMsg::UdpRxPdu(msg) => {
                events::process_udp_pdu(self, msg.src_addr, msg.pdu);
            }
            // Hello adjacency timeout.
            ProtocolInputMsg::AdjTimeout(msg) => {
                events::process_adj_timeout(self, msg.lsr_id);
            }
            // Accepted TCP connection request.
            ProtocolInputMsg::TcpAccept(msg) => {
                events::process_tcp_accept(self, msg.stream, msg.conn_info);
            }
            // Outcome of a TCP connection attempt.
            ProtocolInputMsg::TcpConnect(msg) => {
                events::process_tcp_connect(self, msg.lsr_id, msg.conn);
            }
            // Peer initialization backoff timeout.
            ProtocolInputMsg::NbrBackoffTimeout(msg) => {
                events::process_nbr_backoff_timeout(self, msg.lsr_id);
            }
            // Session closed.
            ProtocolInputMsg::SessionClosed(msg) => {
                events::process_session_closed(self, msg.lsr_id);
            }
        }
    }

    async fn shutdown(self) {
        Debug::InstanceStop.log();

        // Stop discovery and stop accepting connections.
        let InstanceState {
            discovery,
            tcp_listener_task,
            registry,
            ..
        } = self;
        drop(discovery);
        drop(tcp_listener_task);

        // Close all sessions.
        let sessions = registry
            .lock()
            .iter_mut()
            .filter_map(|peer| peer.session.take())
            .collect::<Vec<_>>();
        for session in &sessions {
            session.stop(StatusCode::Shutdown);
        }
        for session in sessions {
            let _ = session.into_task().await;
        }

        registry.lock().clear();
    }
}

// ===== impl ProtocolInputChannelsRx =====

impl ProtocolInputChannelsRx {
    async fn recv(&mut self) -> Option<ProtocolInputMsg> {
        tokio::select! {
            msg = self.udp_pdu_rx.recv() => {
                msg.map(ProtocolInputMsg::UdpRxPdu)
            }
            msg = self.adj_timeout.recv() => {
                msg.map(ProtocolInputMsg::AdjTimeout)
            }
            msg = self.tcp_accept.recv() => {
                msg.map(ProtocolInputMsg::TcpAccept)
            }
            msg = self.tcp_connect.recv() => {
                msg.map(ProtocolInputMsg::TcpConnect)
            }
            msg = self.nbr_backoff_timeout.recv() => {
                msg.map(ProtocolInputMsg::NbrBackoffTimeout)
            }
            msg = self.session_closed.recv() => {
                msg.map(ProtocolInputMsg::SessionClosed)
            }
        }
    }
}

// ===== helper functions =====

fn protocol_input_channels()
-> (ProtocolInputChannelsTx, ProtocolInputChannelsRx) {
    let (udp_pdu_rxp, udp_pdu_rxc) = mpsc::channel(4);
    let (adj_timeoutp, adj_timeoutc) = mpsc::channel(4);
    let (tcp_acceptp, tcp_acceptc) = mpsc::channel(4);
    let (tcp_connectp, tcp_connectc) = mpsc::channel(4);
    let (nbr_backoff_timeoutp, nbr_backoff_timeoutc) = mpsc::channel(4);
    let (session_closedp, session_closedc) = mpsc::channel(4);

    let tx = ProtocolInputChannelsTx {
        udp_pdu_rx: udp_pdu_rxp,
        adj_timeout: adj_timeoutp,
        tcp_accept: tcp_acceptp,
        tcp_connect: tcp_connectp,
        nbr_backoff_timeout: nbr_backoff_timeoutp,
        session_closed: session_closedp,
    };
    let rx = ProtocolInputChannelsRx {
        udp_pdu_rx: udp_pdu_rxc,
        adj_timeout: adj_timeoutc,
        tcp_accept: tcp_acceptc,
        tcp_connect: tcp_connectc,
        nbr_backoff_timeout: nbr_backoff_timeoutc,
        session_closed: session_closedc,
    };

    (tx, rx)
}

// ===== unit tests =====
