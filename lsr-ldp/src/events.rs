//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::time::Duration;

use lsr_utils::socket::{TcpConnInfo, TcpStream};

use crate::debug::Debug;
use crate::discovery::{self, HelloInfo};
use crate::error::Error;
use crate::instance::InstanceState;
use crate::packet::{DecodeError, Pdu, StatusCode};
use crate::registry::{Peer, Role};
use crate::session::Session;
use crate::tasks;

// ===== UDP packet receipt =====

pub(crate) fn process_udp_pdu(
    instance: &InstanceState,
    src_addr: Ipv4Addr,
    pdu: Result<Pdu, DecodeError>,
) {
    let pdu = match pdu {
        Ok(pdu) => pdu,
        Err(error) => {
            Error::HelloDecode(error).log();
            return;
        }
    };

    let Some((info, hello)) =
        discovery::on_hello(&pdu, src_addr, instance.router_id)
    else {
        return;
    };
    Debug::AdjacencyHelloRx(&src_addr, &info.lsr_id, hello).log();

    process_hello(instance, info);
}

fn process_hello(instance: &InstanceState, info: HelloInfo) {
    let mut registry = instance.registry.lock();

    // Create a peer on the first Hello from an unseen LSR.
    if registry.get(&info.lsr_id).is_none() {
        let role = Role::resolve(instance.router_id, info.lsr_id);
        Debug::AdjacencyCreate(&info.lsr_id, &info.trans_addr).log();
        Debug::NbrRoleResolved(&info.lsr_id, &role).log();
        registry.insert(info.lsr_id, info.trans_addr, role);
    }
    let Some(peer) = registry.get_mut(&info.lsr_id) else {
        return;
    };

    // Shutdown the session if the advertised transport address has changed.
    if peer.trans_addr != info.trans_addr {
        peer.trans_addr = info.trans_addr;
        if let Some(session) = &peer.session {
            session.stop(StatusCode::Shutdown);
        }
    }

    // (Re)start the adjacency timeout.
    peer.tasks.adj_timeout = info.holdtime.map(|holdtime| {
        tasks::adj_timeout(info.lsr_id, holdtime, &instance.tx.adj_timeout)
    });

    // Start TCP connection when playing the active role of session
    // establishment.
    if peer.role == Role::Active
        && peer.session.is_none()
        && peer.tasks.connect.is_none()
        && peer.tasks.backoff_timeout.is_none()
    {
        connect(instance, peer);
    }
}

// ===== hello adjacency timeout =====

pub(crate) fn process_adj_timeout(instance: &InstanceState, lsr_id: Ipv4Addr) {
    let mut registry = instance.registry.lock();
    let Some(peer) = registry.get_mut(&lsr_id) else {
        return;
    };

    Debug::AdjacencyTimeout(&lsr_id).log();
    peer.tasks.adj_timeout = None;

    // The peer goes away once its session is closed.
    if let Some(session) = &peer.session {
        session.stop(StatusCode::HoldTimerExp);
        return;
    }

    Debug::AdjacencyDelete(&lsr_id).log();
    registry.remove(&lsr_id);
}

// ===== TCP connection request =====

pub(crate) fn process_tcp_accept(
    instance: &InstanceState,
    stream: TcpStream,
    conn_info: TcpConnInfo,
) {
    let mut registry = instance.registry.lock();

    // Lookup peer.
    let source = conn_info.remote_addr;
    let Some(peer) = registry.get_mut_by_trans_addr(&source) else {
        Debug::NoMatchingHelloAdjacency(&source).log();
        return;
    };

    // Sanity checks.
    if peer.role == Role::Active {
        Error::UnexpectedConn(peer.lsr_id).log();
        return;
    }
    if peer.session.is_some() {
        Error::DuplicateConn(peer.lsr_id).log();
        return;
    }

    start_session(instance, peer, stream, conn_info);
}

// ===== TCP connection established =====

pub(crate) fn process_tcp_connect(
    instance: &InstanceState,
    lsr_id: Ipv4Addr,
    conn: Result<(TcpStream, TcpConnInfo), Error>,
) {
    let mut registry = instance.registry.lock();
    let Some(peer) = registry.get_mut(&lsr_id) else {
        return;
    };
    peer.tasks.connect = None;

    match conn {
        Ok((stream, conn_info)) => {
            if peer.session.is_some() {
                Error::DuplicateConn(lsr_id).log();
                return;
            }
            start_session(instance, peer, stream, conn_info);
        }
        Err(error) => {
            error.log();

            // Try again later.
            let delay = Duration::from_secs(peer.next_backoff());
            Debug::NbrConnectRetry(&lsr_id, &delay).log();
            let task = tasks::nbr_backoff_timeout(
                lsr_id,
                delay,
                &instance.tx.nbr_backoff_timeout,
            );
            peer.tasks.backoff_timeout = Some(task);
        }
    }
}

// ===== peer initialization backoff timeout =====

pub(crate) fn process_nbr_backoff_timeout(
    instance: &InstanceState,
    lsr_id: Ipv4Addr,
) {
    let mut registry = instance.registry.lock();
    let Some(peer) = registry.get_mut(&lsr_id) else {
        return;
    };

    Debug::NbrInitBackoffTimeout(&lsr_id).log();
    peer.tasks.backoff_timeout = None;

    if peer.session.is_none() {
        connect(instance, peer);
    }
}

// ===== session teardown =====

pub(crate) fn process_session_closed(
    instance: &InstanceState,
    lsr_id: Ipv4Addr,
) {
    // A subsequent Hello starts discovery over from scratch.
    instance.registry.lock().remove(&lsr_id);
}

// ===== helper functions =====

fn connect(instance: &InstanceState, peer: &mut Peer) {
    let task = tasks::tcp_connect(
        peer.lsr_id,
        peer.trans_addr,
        &instance.config,
        &instance.tx.tcp_connect,
    );
    peer.tasks.connect = Some(task);
}

fn start_session(
    instance: &InstanceState,
    peer: &mut Peer,
    stream: TcpStream,
    conn_info: TcpConnInfo,
) {
    let session = Session::spawn(
        peer.lsr_id,
        peer.role,
        stream,
        conn_info,
        &instance.config,
        &instance.msg_id,
        &instance.peer_eventp,
        &instance.tx.session_closed,
    );
    peer.session = Some(session);
    peer.tasks.backoff_timeout = None;
}
