//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU32};
use std::time::Instant;

use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use lsr_utils::mpls::Label;
use lsr_utils::socket::{OwnedWriteHalf, TcpConnInfo, TcpStream};
use lsr_utils::task::{IntervalTask, Task, TimeoutTask};
use lsr_utils::{Sender, UnboundedReceiver, UnboundedSender};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{Instrument, debug_span};

use crate::config::Config;
use crate::debug::Debug;
use crate::error::{Error, IoError};
use crate::instance::PeerEvent;
use crate::network;
use crate::packet::{Message, MessageType, Pdu, SessionParams, StatusCode, Tlv};
use crate::registry::Role;
use crate::tasks;
use crate::tasks::messages::SessionMsg;
use crate::tasks::messages::input::SessionClosedMsg;

// Per-peer session engine.
//
// Each session runs in its own task and exclusively owns its connection.
// Messages from the peer, timer expirations and stop requests all arrive
// through a single channel, so they're processed strictly in order.
#[derive(Debug)]
pub struct Session {
    pub lsr_id: Ipv4Addr,
    pub role: Role,
    pub state: fsm::State,
    pub conn_info: TcpConnInfo,
    pub max_pdu_len: u16,
    pub kalive_holdtime_rcvd: Option<u16>,
    pub kalive_holdtime_negotiated: Option<u16>,
    pub kalive_interval: Option<u16>,
    pub addr_list: BTreeSet<Ipv4Addr>,
    pub rcvd_mappings: BTreeMap<Ipv4Network, Label>,
    pub statistics: Statistics,
    pub uptime: Option<Instant>,
    config: Arc<Config>,
    msg_id: Arc<AtomicU32>,
    stream: OwnedWriteHalf,
    tasks: SessionTasks,
    session_msgp: UnboundedSender<SessionMsg>,
    status_tx: watch::Sender<SessionStatus>,
    peer_eventp: broadcast::Sender<PeerEvent>,
    peer_up_sent: bool,
}

#[derive(Debug, Default)]
struct SessionTasks {
    rx: Option<Task<()>>,
    kalive_tx: Option<IntervalTask>,
    hold_timeout: Option<TimeoutTask>,
}

// Handle to a running session, owned by the peer registry.
#[derive(Debug)]
pub struct SessionHandle {
    msgp: UnboundedSender<SessionMsg>,
    status: watch::Receiver<SessionStatus>,
    task: Task<()>,
}

// Session state published after every change.
#[derive(Clone, Debug, Default)]
pub struct SessionStatus {
    pub state: fsm::State,
    pub kalive_holdtime_negotiated: Option<u16>,
    pub kalive_interval: Option<u16>,
    pub addr_list: BTreeSet<Ipv4Addr>,
    pub bindings: usize,
    pub statistics: Statistics,
}

// Session statistics.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Statistics {
    pub discontinuity_time: Option<DateTime<Utc>>,
    pub msgs_rcvd: MessageStatistics,
    pub msgs_sent: MessageStatistics,
}

// Inbound and outbound statistic counters.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MessageStatistics {
    pub address: u64,
    pub address_withdraw: u64,
    pub initialization: u64,
    pub keepalive: u64,
    pub label_abort_request: u64,
    pub label_mapping: u64,
    pub label_release: u64,
    pub label_request: u64,
    pub label_withdraw: u64,
    pub notification: u64,
    pub total: u64,
}

// Session Initialization FSM:
//
//  State        | Event                     | Next state   | Action
// --------------+---------------------------+--------------+----------------
//  NonExistent  | ConnectionUp (active)     | Initial      | SendInit
//  NonExistent  | ConnectionUp (passive)    | Initial      | -
//  Initial      | InitSent (active)         | OpenSent     | -
//  Initial      | InitRcvd (passive)        | OpenReceived | SendInit +
//               |                           |              |  SendKeepalive
//  OpenSent     | InitRcvd                  | OpenReceived | SendKeepalive
//  OpenReceived | KeepaliveRcvd             | Operational  | StartSession
//  Operational  | KeepaliveRcvd             | Operational  | -
//  Operational  | AdvertisementRcvd         | Operational  | -
//  (any)        | HoldTimerExpired          | Closed       | SendNotification
//  (any)        | DecodeError, ErrorSent    | Closed       | SendNotification
//  (any)        | ErrorRcvd, ConnectionDown | Closed       | CloseSession
//
// Any other event is a protocol violation: the session is closed after a
// Shutdown notification.
pub mod fsm {
    use serde::{Deserialize, Serialize};

    use crate::packet::StatusCode;
    use crate::registry::Role;

    #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
    #[derive(Serialize)]
    pub enum State {
        #[default]
        NonExistent,
        Initial,
        OpenSent,
        OpenReceived,
        Operational,
        Closed,
    }

    #[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
    pub enum Event {
        ConnectionUp,
        InitSent,
        InitRcvd,
        KeepaliveRcvd,
        // Address or label advertisement.
        AdvertisementRcvd,
        HoldTimerExpired,
        // Malformed PDU received.
        DecodeError(StatusCode),
        // Locally detected fatal error.
        ErrorSent(StatusCode),
        // Fatal error notification received.
        ErrorRcvd,
        ConnectionDown,
    }

    #[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
    pub enum Action {
        SendInit,
        SendInitAndKeepalive,
        SendKeepalive,
        StartSession,
        SendNotification(StatusCode),
        CloseSession,
    }

    // Looks up the transition table. Returns `None` for events that aren't
    // valid in the given state.
    pub fn next(
        state: State,
        role: Role,
        event: Event,
    ) -> Option<(State, Option<Action>)> {
        match (state, event) {
            (State::NonExistent, Event::ConnectionUp) => match role {
                Role::Active => Some((State::Initial, Some(Action::SendInit))),
                Role::Passive => Some((State::Initial, None)),
            },
            (State::Initial, Event::InitSent) if role == Role::Active => {
                Some((State::OpenSent, None))
            }
            (State::Initial, Event::InitRcvd) if role == Role::Passive => Some((
                State::OpenReceived,
                Some(Action::SendInitAndKeepalive),
            )),
            (State::OpenSent, Event::InitRcvd) => {
                Some((State::OpenReceived, Some(Action::SendKeepalive)))
            }
            (State::OpenReceived, Event::KeepaliveRcvd) => {
                Some((State::Operational, Some(Action::StartSession)))
            }
            (
                State::Operational,
                Event::KeepaliveRcvd | Event::AdvertisementRcvd,
            ) => Some((State::Operational, None)),
            // Session teardown.
            (State::Closed, _) => None,
            (_, Event::HoldTimerExpired) => Some((
                State::Closed,
                Some(Action::SendNotification(StatusCode::KeepaliveExp)),
            )),
            (_, Event::DecodeError(status) | Event::ErrorSent(status)) => {
                Some((State::Closed, Some(Action::SendNotification(status))))
            }
            (_, Event::ErrorRcvd | Event::ConnectionDown) => {
                Some((State::Closed, Some(Action::CloseSession)))
            }
            _ => None,
        }
    }

    // Total version of `next`: unexpected events close the session.
    pub fn transition(
        state: State,
        role: Role,
        event: Event,
    ) -> (State, Option<Action>) {
        match next(state, role, event) {
            Some(transition) => transition,
            None if state == State::Closed => (State::Closed, None),
            None => (
                State::Closed,
                Some(Action::SendNotification(StatusCode::Shutdown)),
            ),
        }
    }
}

// ===== impl Session =====

impl Session {
    // Starts the session task for a freshly established connection.
    pub(crate) fn spawn(
        lsr_id: Ipv4Addr,
        role: Role,
        stream: TcpStream,
        conn_info: TcpConnInfo,
        config: &Arc<Config>,
        msg_id: &Arc<AtomicU32>,
        peer_eventp: &broadcast::Sender<PeerEvent>,
        session_closedp: &Sender<SessionClosedMsg>,
    ) -> SessionHandle {
        let span = debug_span!("session", %lsr_id);
        let _span_guard = span.enter();

        let (read_half, write_half) = stream.into_split();
        let (session_msgp, session_msgc) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let rx_task = tasks::session_rx(
            read_half,
            lsr_id,
            conn_info.remote_addr,
            &session_msgp,
        );
        let session = Session {
            lsr_id,
            role,
            state: fsm::State::NonExistent,
            conn_info,
            max_pdu_len: Pdu::DFLT_MAX_LEN,
            kalive_holdtime_rcvd: None,
            kalive_holdtime_negotiated: None,
            kalive_interval: None,
            addr_list: Default::default(),
            rcvd_mappings: Default::default(),
            statistics: Default::default(),
            uptime: None,
            config: config.clone(),
            msg_id: msg_id.clone(),
            stream: write_half,
            tasks: SessionTasks {
                rx: Some(rx_task),
                ..Default::default()
            },
            session_msgp: session_msgp.clone(),
            status_tx,
            peer_eventp: peer_eventp.clone(),
            peer_up_sent: false,
        };

        let session_closedp = session_closedp.clone();
        let task = Task::spawn(
            async move {
                session.run(session_msgc).await;

                // Send message to the parent LDP task.
                let msg = SessionClosedMsg { lsr_id };
                let _ = session_closedp.send(msg).await;
            }
            .in_current_span(),
        );

        SessionHandle {
            msgp: session_msgp,
            status: status_rx,
            task,
        }
    }

    async fn run(mut self, mut session_msgc: UnboundedReceiver<SessionMsg>) {
        // Until Init is received, the locally configured hold time applies.
        self.start_hold_timeout(self.config.keepalive_time);
        self.fsm(fsm::Event::ConnectionUp).await;

        while self.state != fsm::State::Closed {
            let Some(msg) = session_msgc.recv().await else {
                break;
            };

            match msg {
                SessionMsg::RxPdu(Ok(pdu)) => self.process_pdu(pdu).await,
                SessionMsg::RxPdu(Err(Error::PeerDecode(
                    lsr_id,
                    error,
                ))) => {
                    let status = error.status_code();
                    Error::PeerDecode(lsr_id, error).log();
                    self.fsm(fsm::Event::DecodeError(status)).await;
                }
                SessionMsg::RxPdu(Err(error)) => {
                    error.log();
                    self.fsm(fsm::Event::ConnectionDown).await;
                }
                SessionMsg::KeepaliveTick => {
                    let msg = self.generate_keepalive();
                    self.send_messages([msg]).await;
                }
                SessionMsg::HoldTimeout => {
                    self.fsm(fsm::Event::HoldTimerExpired).await;
                }
                SessionMsg::Stop(status) => {
                    self.fsm(fsm::Event::ErrorSent(status)).await;
                }
            }
        }

        // The channel was closed without an explicit stop request.
        if self.state != fsm::State::Closed {
            self.fsm(fsm::Event::ErrorSent(StatusCode::Shutdown)).await;
        }
    }

    async fn fsm(&mut self, event: fsm::Event) {
        let mut next_event = Some(event);
        while let Some(event) = next_event.take() {
            let (new_state, action) =
                match fsm::next(self.state, self.role, event) {
                    Some(transition) => transition,
                    None => {
                        Error::FsmUnexpectedEvent(
                            self.lsr_id,
                            self.state,
                            event,
                        )
                        .log();
                        fsm::transition(self.state, self.role, event)
                    }
                };

            if new_state != self.state {
                Debug::NbrFsmTransition(
                    &self.lsr_id,
                    &event,
                    &self.state,
                    &new_state,
                )
                .log();
                self.state = new_state;
                self.publish_status();
            }

            if let Some(action) = action {
                next_event = self.fsm_action(action).await;
                self.publish_status();
            }
        }
    }

    // Executes an FSM action, returning the event it generates, if any.
    async fn fsm_action(&mut self, action: fsm::Action) -> Option<fsm::Event> {
        match action {
            fsm::Action::SendInit => {
                let msg = self.generate_init();
                self.send_messages([msg]).await;
                Some(fsm::Event::InitSent)
            }
            fsm::Action::SendInitAndKeepalive => {
                let init = self.generate_init();
                let keepalive = self.generate_keepalive();
                self.send_messages([init, keepalive]).await;
                self.start_kalive_interval();
                None
            }
            fsm::Action::SendKeepalive => {
                let msg = self.generate_keepalive();
                self.send_messages([msg]).await;
                self.start_kalive_interval();
                None
            }
            fsm::Action::StartSession => {
                self.uptime = Some(Instant::now());
                self.statistics.discontinuity_time = Some(Utc::now());

                // Advertise the local interface addresses.
                let addr_list = self.config.enabled_interfaces.clone();
                let msg_id = self.next_msg_id();
                let msg = Message::new(MessageType::Address, msg_id)
                    .with_tlv(Tlv::AddrList(addr_list));
                self.send_messages([msg]).await;

                self.peer_up_sent = true;
                let _ = self.peer_eventp.send(PeerEvent::Up(self.lsr_id));
                None
            }
            fsm::Action::SendNotification(status) => {
                let msg_id = self.next_msg_id();
                let msg = Message::notification(msg_id, status, None);
                self.send_messages([msg]).await;
                Error::NotificationSent(self.lsr_id, status).log();
                self.close().await;
                None
            }
            fsm::Action::CloseSession => {
                self.close().await;
                None
            }
        }
    }

    async fn process_pdu(&mut self, pdu: Pdu) {
        // Any received PDU counts as a sign of life.
        if let Some(hold_timeout) = &mut self.tasks.hold_timeout {
            hold_timeout.reset(None);
        }

        for msg in pdu.messages {
            self.process_msg(msg).await;
            if self.state == fsm::State::Closed {
                return;
            }
        }
        self.publish_status();
    }

    async fn process_msg(&mut self, msg: Message) {
        Debug::NbrMsgRx(&self.lsr_id, &msg).log();
        self.statistics.msgs_rcvd.update(&msg);

        match msg.msg_type {
            MessageType::Initialization => self.process_init(&msg).await,
            MessageType::Keepalive => {
                self.fsm(fsm::Event::KeepaliveRcvd).await;
            }
            MessageType::Notification => {
                if msg.is_fatal_error() {
                    let status = msg.status_code();
                    Error::NotificationRcvd(self.lsr_id, status).log();
                    self.fsm(fsm::Event::ErrorRcvd).await;
                }
            }
            MessageType::Address | MessageType::AddressWithdraw => {
                self.fsm(fsm::Event::AdvertisementRcvd).await;
                if self.state == fsm::State::Operational {
                    self.process_address(&msg);
                }
            }
            MessageType::LabelMapping
            | MessageType::LabelRequest
            | MessageType::LabelWithdraw
            | MessageType::LabelRelease
            | MessageType::LabelAbortReq => {
                self.fsm(fsm::Event::AdvertisementRcvd).await;
                if self.state == fsm::State::Operational {
                    self.process_label(&msg);
                }
            }
            // Hellos belong to discovery.
            MessageType::Hello => (),
        }
    }

    async fn process_init(&mut self, msg: &Message) {
        if matches!(self.state, fsm::State::Initial | fsm::State::OpenSent)
            && let Some(params) = msg.session_params()
        {
            // The Init must be addressed to the local LSR.
            if params.lsr_id != self.config.router_id() || params.lspace_id != 0
            {
                let status = StatusCode::SessRejNoHello;
                self.fsm(fsm::Event::ErrorSent(status)).await;
                return;
            }

            self.negotiate(params);
        }

        self.fsm(fsm::Event::InitRcvd).await;
    }

    fn negotiate(&mut self, params: &SessionParams) {
        let holdtime = self.config.keepalive_time.min(params.keepalive_time);
        self.kalive_holdtime_rcvd = Some(params.keepalive_time);
        self.kalive_holdtime_negotiated = Some(holdtime);
        self.kalive_interval = Some((holdtime / 3).max(1));

        // Values up to 255 select the default maximum.
        self.max_pdu_len = if params.max_pdu_len > 255 {
            params.max_pdu_len.min(Pdu::DFLT_MAX_LEN)
        } else {
            Pdu::DFLT_MAX_LEN
        };

        self.start_hold_timeout(holdtime);
    }

    fn process_address(&mut self, msg: &Message) {
        let addr_list = msg.addr_list();
        if msg.msg_type == MessageType::Address {
            self.addr_list.extend(addr_list);
        } else {
            for addr in addr_list {
                self.addr_list.remove(addr);
            }
        }
    }

    fn process_label(&mut self, msg: &Message) {
        let Some(fec) = msg.fec() else {
            return;
        };

        match msg.msg_type {
            MessageType::LabelMapping => {
                let Some(label) = msg.label() else {
                    return;
                };
                for prefix in fec.prefixes() {
                    self.rcvd_mappings.insert(prefix, label);
                }
            }
            MessageType::LabelWithdraw if fec.has_wildcard() => {
                self.rcvd_mappings.clear();
            }
            MessageType::LabelWithdraw => {
                for prefix in fec.prefixes() {
                    self.rcvd_mappings.remove(&prefix);
                }
            }
            // Downstream unsolicited mode: requests are never answered.
            _ => (),
        }
    }

    async fn send_messages<I>(&mut self, msgs: I)
    where
        I: IntoIterator<Item = Message>,
    {
        let mut pdu = Pdu::new(self.config.router_id(), 0);
        for msg in msgs {
            Debug::NbrMsgTx(&self.lsr_id, &msg).log();
            self.statistics.msgs_sent.update(&msg);
            pdu.messages.push_back(msg);
        }

        // Write errors surface as a closed connection on the receive side.
        if let Err(error) =
            network::tcp::send_pdu(&mut self.stream, &pdu, self.max_pdu_len)
                .await
        {
            IoError::TcpSend(error).log();
        }
    }

    fn generate_init(&self) -> Message {
        let params = SessionParams {
            keepalive_time: self.config.keepalive_time,
            lsr_id: self.lsr_id,
            lspace_id: 0,
            ..Default::default()
        };
        Message::new(MessageType::Initialization, self.next_msg_id())
            .with_tlv(params)
    }

    fn generate_keepalive(&self) -> Message {
        Message::keepalive(self.next_msg_id())
    }

    fn next_msg_id(&self) -> u32 {
        self.msg_id.fetch_add(1, atomic::Ordering::Relaxed) + 1
    }

    fn start_kalive_interval(&mut self) {
        let interval = self
            .kalive_interval
            .unwrap_or_else(|| (self.config.keepalive_time / 3).max(1));
        let task = tasks::session_kalive_interval(interval, &self.session_msgp);
        self.tasks.kalive_tx = Some(task);
    }

    fn start_hold_timeout(&mut self, holdtime: u16) {
        let task = tasks::session_hold_timeout(holdtime, &self.session_msgp);
        self.tasks.hold_timeout = Some(task);
    }

    async fn close(&mut self) {
        // Timers are stopped before the connection is released.
        self.tasks.kalive_tx = None;
        self.tasks.hold_timeout = None;
        self.tasks.rx = None;
        let _ = self.stream.shutdown().await;

        if self.peer_up_sent {
            self.peer_up_sent = false;
            let _ = self.peer_eventp.send(PeerEvent::Down(self.lsr_id));
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(SessionStatus {
            state: self.state,
            kalive_holdtime_negotiated: self.kalive_holdtime_negotiated,
            kalive_interval: self.kalive_interval,
            addr_list: self.addr_list.clone(),
            bindings: self.rcvd_mappings.len(),
            statistics: self.statistics.clone(),
        });
    }
}

// ===== impl SessionHandle =====

impl SessionHandle {
    // Requests the session to close, sending a notification with the given
    // status code first.
    pub(crate) fn stop(&self, status: StatusCode) {
        let _ = self.msgp.send(SessionMsg::Stop(status));
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn into_task(self) -> Task<()> {
        self.task
    }
}

// ===== impl MessageStatistics =====

impl MessageStatistics {
    pub(crate) fn update(&mut self, msg: &Message) {
        match msg.msg_type {
            MessageType::Notification => self.notification += 1,
            MessageType::Hello => (),
            MessageType::Initialization => self.initialization += 1,
            MessageType::Keepalive => self.keepalive += 1,
            MessageType::Address => self.address += 1,
            MessageType::AddressWithdraw => self.address_withdraw += 1,
            MessageType::LabelMapping => self.label_mapping += 1,
            MessageType::LabelRequest => self.label_request += 1,
            MessageType::LabelWithdraw => self.label_withdraw += 1,
            MessageType::LabelRelease => self.label_release += 1,
            MessageType::LabelAbortReq => self.label_abort_request += 1,
        }
        self.total += 1;
    }
}

// ===== unit tests =====
