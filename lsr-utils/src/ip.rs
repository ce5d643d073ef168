//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

// Address Family identifier.
//
// IANA registry:
// http://www.iana.org/assignments/address-family-numbers
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(FromPrimitive, ToPrimitive)]
#[derive(Deserialize, Serialize)]
pub enum AddressFamily {
    Ipv4 = 1,
    Ipv6 = 2,
}

// Extension methods for Ipv4Addr.
pub trait Ipv4AddrExt {
    const LENGTH: usize;

    // Returns true if this address can be used as a router or transport
    // address.
    fn is_usable(&self) -> bool;
}

// Extension methods for Ipv4Network.
pub trait Ipv4NetworkExt {
    const MAX_PREFIXLEN: u8;

    // Apply mask to prefix.
    #[must_use]
    fn apply_mask(&self) -> Ipv4Network;
}

// ===== impl AddressFamily =====

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

// ===== impl Ipv4Addr =====

impl Ipv4AddrExt for Ipv4Addr {
    const LENGTH: usize = 4;

    fn is_usable(&self) -> bool {
        !(self.is_loopback()
            || self.is_broadcast()
            || self.is_multicast()
            || self.is_unspecified())
    }
}

// ===== impl Ipv4Network =====

impl Ipv4NetworkExt for Ipv4Network {
    const MAX_PREFIXLEN: u8 = 32;

    fn apply_mask(&self) -> Ipv4Network {
        Ipv4Network::new(self.network(), self.prefix()).unwrap_or(*self)
    }
}

// ===== unit tests =====
