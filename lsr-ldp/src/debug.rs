//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{debug, debug_span};

use crate::packet::Message;
use crate::registry::Role;
use crate::session::fsm;

// LDP debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    InstanceStart,
    InstanceStop,
    InterfaceStart(&'a Ipv4Addr),
    AdjacencyCreate(&'a Ipv4Addr, &'a Ipv4Addr),
    AdjacencyDelete(&'a Ipv4Addr),
    AdjacencyTimeout(&'a Ipv4Addr),
    AdjacencyHelloRx(&'a Ipv4Addr, &'a Ipv4Addr, &'a Message),
    AdjacencyHelloTx(&'a Ipv4Addr, &'a Message),
    NoMatchingHelloAdjacency(&'a Ipv4Addr),
    NbrRoleResolved(&'a Ipv4Addr, &'a Role),
    NbrCreate(&'a Ipv4Addr),
    NbrDelete(&'a Ipv4Addr),
    NbrFsmTransition(
        &'a Ipv4Addr,
        &'a fsm::Event,
        &'a fsm::State,
        &'a fsm::State,
    ),
    NbrMsgRx(&'a Ipv4Addr, &'a Message),
    NbrMsgTx(&'a Ipv4Addr, &'a Message),
    NbrConnectRetry(&'a Ipv4Addr, &'a Duration),
    NbrInitBackoffTimeout(&'a Ipv4Addr),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::InstanceStart | Debug::InstanceStop => {
                // Parent span(s): ldp-instance
                debug!("{}", self);
            }
            Debug::InterfaceStart(addr) => {
                // Parent span(s): ldp-instance
                debug_span!("interface", %addr).in_scope(|| {
                    debug!("{}", self);
                })
            }
            Debug::AdjacencyCreate(lsr_id, trans_addr) => {
                // Parent span(s): ldp-instance
                debug_span!("discovery").in_scope(|| {
                    debug!(%lsr_id, %trans_addr, "{}", self);
                })
            }
            Debug::AdjacencyDelete(lsr_id)
            | Debug::AdjacencyTimeout(lsr_id) => {
                // Parent span(s): ldp-instance
                debug_span!("discovery").in_scope(|| {
                    debug!(%lsr_id, "{}", self);
                })
            }
            Debug::AdjacencyHelloRx(src_addr, lsr_id, msg) => {
                // Parent span(s): ldp-instance
                debug_span!("discovery").in_scope(|| {
                    debug_span!("input").in_scope(|| {
                        let data =
                            serde_json::to_string(&msg).unwrap_or_default();
                        debug!(source = %src_addr, %lsr_id, %data, "{}", self);
                    })
                })
            }
            Debug::AdjacencyHelloTx(addr, msg) => {
                // Parent span(s): ldp-instance:interface
                debug_span!("discovery").in_scope(|| {
                    debug_span!("output").in_scope(|| {
                        let data =
                            serde_json::to_string(&msg).unwrap_or_default();
                        debug!(interface = %addr, %data, "{}", self);
                    })
                })
            }
            Debug::NoMatchingHelloAdjacency(addr) => {
                // Parent span(s): ldp-instance
                debug_span!("session").in_scope(|| {
                    debug!(address = %addr, "{}", self);
                })
            }
            Debug::NbrRoleResolved(lsr_id, role) => {
                // Parent span(s): ldp-instance
                debug_span!("peer", %lsr_id).in_scope(|| {
                    debug!(?role, "{}", self);
                })
            }
            Debug::NbrCreate(lsr_id)
            | Debug::NbrDelete(lsr_id)
            | Debug::NbrInitBackoffTimeout(lsr_id) => {
                // Parent span(s): ldp-instance
                debug_span!("peer", %lsr_id).in_scope(|| {
                    debug!("{}", self);
                })
            }
            Debug::NbrFsmTransition(lsr_id, event, old_state, new_state) => {
                // Parent span(s): ldp-instance:session
                debug_span!("peer", %lsr_id).in_scope(|| {
                    debug_span!("fsm").in_scope(|| {
                        debug!(?event, ?old_state, ?new_state, "{}", self);
                    })
                })
            }
            Debug::NbrMsgRx(lsr_id, msg) => {
                // Parent span(s): ldp-instance:session
                debug_span!("peer", %lsr_id).in_scope(|| {
                    debug_span!("input").in_scope(|| {
                        let data =
                            serde_json::to_string(&msg).unwrap_or_default();
                        debug!(r#type = %msg.msg_type, %data, "{}", self);
                    })
                })
            }
            Debug::NbrMsgTx(lsr_id, msg) => {
                // Parent span(s): ldp-instance:session
                debug_span!("peer", %lsr_id).in_scope(|| {
                    debug_span!("output").in_scope(|| {
                        let data =
                            serde_json::to_string(&msg).unwrap_or_default();
                        debug!(r#type = %msg.msg_type, %data, "{}", self);
                    })
                })
            }
            Debug::NbrConnectRetry(lsr_id, delay) => {
                // Parent span(s): ldp-instance
                debug_span!("peer", %lsr_id).in_scope(|| {
                    debug!(?delay, "{}", self);
                })
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceStart => {
                write!(f, "starting instance")
            }
            Debug::InstanceStop => {
                write!(f, "stopping instance")
            }
            Debug::InterfaceStart(..) => {
                write!(f, "starting interface")
            }
            Debug::AdjacencyCreate(..) => {
                write!(f, "adjacency created")
            }
            Debug::AdjacencyDelete(..) => {
                write!(f, "adjacency deleted")
            }
            Debug::AdjacencyTimeout(..) => {
                write!(f, "adjacency timed out")
            }
            Debug::AdjacencyHelloRx(..) | Debug::AdjacencyHelloTx(..) => {
                write!(f, "hello message")
            }
            Debug::NoMatchingHelloAdjacency(..) => {
                write!(f, "no matching hello adjacency")
            }
            Debug::NbrRoleResolved(..) => {
                write!(f, "session role resolved")
            }
            Debug::NbrCreate(..) => {
                write!(f, "peer created")
            }
            Debug::NbrDelete(..) => {
                write!(f, "peer deleted")
            }
            Debug::NbrFsmTransition(..) => {
                write!(f, "state transition")
            }
            Debug::NbrMsgRx(..) | Debug::NbrMsgTx(..) => {
                write!(f, "message")
            }
            Debug::NbrConnectRetry(..) => {
                write!(f, "scheduling connection retry")
            }
            Debug::NbrInitBackoffTimeout(..) => {
                write!(f, "initialization backoff timer expired")
            }
        }
    }
}
