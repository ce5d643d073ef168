//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicU32};
use std::time::Duration;

use lsr_utils::Sender;
use lsr_utils::socket::UdpSocket;
use lsr_utils::task::{IntervalTask, Task};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::debug::Debug;
use crate::error::{Error, IoError};
use crate::network;
use crate::packet::{HelloFlags, HelloParams, Message, MessageType, Pdu, Tlv};
use crate::tasks;
use crate::tasks::messages::input::UdpRxPduMsg;

// Basic discovery over the LDP multicast group.
//
// Hello transmission (one interval task per enabled interface) and reception
// (one supervised task) share the socket. Senders are serialized by
// `tx_lock`; the receive path never takes it.
#[derive(Debug)]
pub struct Discovery {
    pub socket: Arc<UdpSocket>,
    pub tx_lock: Arc<Mutex<()>>,
    pub hello_tasks: Vec<IntervalTask>,
    pub rx_task: Task<()>,
}

// Information extracted from a received Hello message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HelloInfo {
    pub lsr_id: Ipv4Addr,
    pub trans_addr: Ipv4Addr,
    pub holdtime: Option<Duration>,
}

// ===== impl Discovery =====

impl Discovery {
    // Default Hello hold time, used when a peer advertises zero.
    pub const DFLT_HOLDTIME: u16 = 15;

    pub(crate) fn start(
        config: &Arc<Config>,
        msg_id: &Arc<AtomicU32>,
        udp_pdu_rxp: &Sender<UdpRxPduMsg>,
    ) -> Result<Discovery, Error> {
        let socket = network::udp::discovery_socket(
            config.ldp_port,
            &config.enabled_interfaces,
        )?;
        let socket = Arc::new(socket);
        let tx_lock = Arc::new(Mutex::new(()));

        // Start receiving Hellos before the first one goes out.
        let rx_task = tasks::discovery_rx(&socket, udp_pdu_rxp);

        let hello_tasks = config
            .enabled_interfaces
            .iter()
            .map(|iface_addr| {
                Debug::InterfaceStart(iface_addr).log();
                tasks::iface_hello_interval(
                    *iface_addr,
                    &socket,
                    &tx_lock,
                    config,
                    msg_id,
                )
            })
            .collect();

        Ok(Discovery {
            socket,
            tx_lock,
            hello_tasks,
            rx_task,
        })
    }
}

// ===== global functions =====

pub(crate) fn generate_hello(config: &Config, msg_id: u32) -> Message {
    let params = HelloParams {
        holdtime: config.hold_time,
        flags: HelloFlags::empty(),
    };
    Message::new(MessageType::Hello, msg_id)
        .with_tlv(params)
        .with_tlv(Tlv::TransportAddr(config.transport_address()))
}

pub(crate) async fn send_hello(
    socket: &UdpSocket,
    tx_lock: &Mutex<()>,
    iface_addr: Ipv4Addr,
    config: &Config,
    msg_id: &AtomicU32,
) {
    let msg_id = msg_id.fetch_add(1, atomic::Ordering::Relaxed) + 1;
    let hello = generate_hello(config, msg_id);
    Debug::AdjacencyHelloTx(&iface_addr, &hello).log();

    let mut pdu = Pdu::new(config.router_id(), 0);
    pdu.messages.push_back(hello);

    // Setting the outgoing interface and sending must not interleave with
    // another sender.
    let _guard = tx_lock.lock().await;
    if let Err(error) = network::udp::send_packet_multicast(
        socket,
        &iface_addr,
        config.ldp_port,
        &pdu,
    )
    .await
    {
        IoError::UdpSend(error).log();
    }
}

// Extracts the discovery information carried by a received Hello PDU.
//
// Returns `None` if the PDU doesn't contain a Hello message or if it was sent
// by the local router.
pub(crate) fn on_hello(
    pdu: &Pdu,
    src_addr: Ipv4Addr,
    router_id: Ipv4Addr,
) -> Option<(HelloInfo, &Message)> {
    // Ignore our own Hellos.
    if pdu.lsr_id == router_id {
        return None;
    }

    let hello = pdu
        .messages
        .iter()
        .find(|msg| msg.msg_type == MessageType::Hello)?;
    let params = hello.hello_params()?;

    let holdtime = match params.holdtime {
        0 => Some(Duration::from_secs(Discovery::DFLT_HOLDTIME.into())),
        HelloParams::INFINITE_HOLDTIME => None,
        holdtime => Some(Duration::from_secs(holdtime.into())),
    };

    let info = HelloInfo {
        lsr_id: pdu.lsr_id,
        trans_addr: hello.transport_addr().unwrap_or(src_addr),
        holdtime,
    };
    Some((info, hello))
}

// ===== unit tests =====
