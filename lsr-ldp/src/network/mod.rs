//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod tcp;
pub mod udp;

// LDP well-known port (discovery and session).
pub const LDP_PORT: u16 = 646;
