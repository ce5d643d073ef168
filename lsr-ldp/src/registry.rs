//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lsr_utils::task::{Task, TimeoutTask};
use serde::{Deserialize, Serialize};

use crate::debug::Debug;
use crate::session::{SessionHandle, fsm};

// Session establishment role.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    // Initiates the TCP connection.
    Active,
    // Accepts the TCP connection.
    Passive,
}

// Peers discovered on the enabled interfaces, keyed by LSR-ID.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeMap<Ipv4Addr, Peer>,
}

// Registry shared between the instance task and its handles.
//
// The lock is only held for lookups and updates, never across an await.
#[derive(Clone, Debug, Default)]
pub struct SharedRegistry(Arc<Mutex<PeerRegistry>>);

#[derive(Debug)]
pub struct Peer {
    pub lsr_id: Ipv4Addr,
    pub trans_addr: Ipv4Addr,
    pub role: Role,
    pub init_attempts: u32,
    pub session: Option<SessionHandle>,
    pub tasks: PeerTasks,
}

#[derive(Debug, Default)]
pub struct PeerTasks {
    pub adj_timeout: Option<TimeoutTask>,
    pub connect: Option<Task<()>>,
    pub backoff_timeout: Option<TimeoutTask>,
}

// Snapshot of a peer and its session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PeerInfo {
    pub lsr_id: Ipv4Addr,
    pub trans_addr: Ipv4Addr,
    pub role: Role,
    pub state: fsm::State,
    pub hold_time: Option<u16>,
    pub keepalive_interval: Option<u16>,
    pub addr_list: BTreeSet<Ipv4Addr>,
    pub bindings: usize,
}

// ===== impl Role =====

impl Role {
    // Resolves the role of the local LSR for a session with the given peer.
    //
    // The LSR with the numerically smaller LSR-ID is the active one, so both
    // ends reach the same conclusion independently.
    pub fn resolve(local_lsr_id: Ipv4Addr, peer_lsr_id: Ipv4Addr) -> Role {
        if u32::from(local_lsr_id) < u32::from(peer_lsr_id) {
            Role::Active
        } else {
            Role::Passive
        }
    }
}

// ===== impl PeerRegistry =====

impl PeerRegistry {
    // Registers a newly discovered peer.
    //
    // Returns `None` if a peer with the same LSR-ID is already known.
    pub(crate) fn insert(
        &mut self,
        lsr_id: Ipv4Addr,
        trans_addr: Ipv4Addr,
        role: Role,
    ) -> Option<&mut Peer> {
        if self.peers.contains_key(&lsr_id) {
            return None;
        }

        Debug::NbrCreate(&lsr_id).log();
        let peer = Peer {
            lsr_id,
            trans_addr,
            role,
            init_attempts: 0,
            session: None,
            tasks: Default::default(),
        };
        Some(self.peers.entry(lsr_id).or_insert(peer))
    }

    pub(crate) fn remove(&mut self, lsr_id: &Ipv4Addr) -> Option<Peer> {
        let peer = self.peers.remove(lsr_id)?;
        Debug::NbrDelete(lsr_id).log();
        Some(peer)
    }

    pub fn get(&self, lsr_id: &Ipv4Addr) -> Option<&Peer> {
        self.peers.get(lsr_id)
    }

    pub(crate) fn get_mut(&mut self, lsr_id: &Ipv4Addr) -> Option<&mut Peer> {
        self.peers.get_mut(lsr_id)
    }

    // Finds the peer that advertised the given transport address.
    pub(crate) fn get_mut_by_trans_addr(
        &mut self,
        trans_addr: &Ipv4Addr,
    ) -> Option<&mut Peer> {
        self.peers
            .values_mut()
            .find(|peer| peer.trans_addr == *trans_addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Peer> {
        self.peers.values_mut()
    }

    pub(crate) fn clear(&mut self) {
        for lsr_id in self.peers.keys() {
            Debug::NbrDelete(lsr_id).log();
        }
        self.peers.clear();
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ===== impl SharedRegistry =====

impl SharedRegistry {
    pub fn lock(&self) -> MutexGuard<'_, PeerRegistry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ===== impl Peer =====

impl Peer {
    // Backoff delays applied to consecutive failed session attempts.
    const INIT_BACKOFF_MIN: u64 = 15;
    const INIT_BACKOFF_MAX: u64 = 120;

    pub fn info(&self) -> PeerInfo {
        match &self.session {
            Some(session) => {
                let status = session.status();
                PeerInfo {
                    lsr_id: self.lsr_id,
                    trans_addr: self.trans_addr,
                    role: self.role,
                    state: status.state,
                    hold_time: status.kalive_holdtime_negotiated,
                    keepalive_interval: status.kalive_interval,
                    addr_list: status.addr_list.clone(),
                    bindings: status.bindings,
                }
            }
            None => PeerInfo {
                lsr_id: self.lsr_id,
                trans_addr: self.trans_addr,
                role: self.role,
                state: fsm::State::NonExistent,
                hold_time: None,
                keepalive_interval: None,
                addr_list: Default::default(),
                bindings: 0,
            },
        }
    }

    // Returns the delay before the next connection attempt, in seconds, and
    // accounts for the failed attempt.
    pub(crate) fn next_backoff(&mut self) -> u64 {
        let delay = Self::INIT_BACKOFF_MIN
            .saturating_mul(1 << self.init_attempts.min(8))
            .min(Self::INIT_BACKOFF_MAX);
        self.init_attempts += 1;
        delay
    }
}

// ===== unit tests =====
