//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod error;
pub mod fec;
pub mod lsp_ping;
pub mod message;
pub mod params;
pub mod pdu;
pub mod status;
pub mod tlv;

use std::net::Ipv4Addr;

pub use error::*;
pub use fec::*;
pub use message::*;
pub use params::*;
pub use pdu::*;
pub use status::*;
pub use tlv::*;

// Information about a received packet.
#[derive(Debug)]
pub struct PacketInfo {
    pub src_addr: Ipv4Addr,
    pub multicast: Option<bool>,
}

// LDP packet decoding context.
pub struct DecodeCxt {
    pub pkt_info: PacketInfo,
    pub pdu_max_len: u16,
    pub validate_pdu_hdr: Option<Box<PduHdrValidationCb>>,
}

// PDU header validation callback.
pub type PduHdrValidationCb =
    dyn Fn(Ipv4Addr, u16) -> DecodeResult<()> + Send + Sync;
