//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ipnetwork::Ipv4Network;
use lsr_utils::bytes::{BytesExt, BytesMutExt};
use lsr_utils::ip::{AddressFamily, Ipv4NetworkExt};
use serde::{Deserialize, Serialize};

use crate::packet::error::{DecodeError, DecodeResult};

// FEC TLV value: one or more FEC elements, each tagged by its type octet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TlvFec(pub Vec<FecElem>);

//
// Prefix FEC element:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Prefix (2)   |     Address Family            |     PreLen    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     Prefix (4 octets)                         |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// The prefix always takes a full address; bits past PreLen are zero.
// The Wildcard element is the type octet alone.
//
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FecElem {
    Wildcard,
    Prefix(Ipv4Network),
}

// FEC element types.
//
// IANA registry:
// https://www.iana.org/assignments/ldp-namespaces/ldp-namespaces.xhtml#fec-type
pub const TLV_FEC_ELEMENT_WILDCARD: u8 = 1;
pub const TLV_FEC_ELEMENT_PREFIX: u8 = 2;

// Element decoder registered for a FEC element type.
type FecElemDecodeFn = fn(&mut Bytes) -> DecodeResult<FecElem>;

// ===== impl TlvFec =====

impl TlvFec {
    pub fn prefixes(&self) -> impl Iterator<Item = Ipv4Network> + '_ {
        self.0.iter().filter_map(|fec_elem| match fec_elem {
            FecElem::Prefix(prefix) => Some(*prefix),
            FecElem::Wildcard => None,
        })
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.contains(&FecElem::Wildcard)
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        for fec_elem in &self.0 {
            fec_elem.encode(buf);
        }
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<TlvFec> {
        if buf.is_empty() {
            return Err(DecodeError::MalformedFec);
        }

        let mut fec_elems = Vec::new();
        while buf.has_remaining() {
            fec_elems.push(FecElem::decode(buf)?);
        }
        Ok(TlvFec(fec_elems))
    }
}

impl From<Ipv4Network> for TlvFec {
    fn from(prefix: Ipv4Network) -> TlvFec {
        TlvFec(vec![FecElem::Prefix(prefix)])
    }
}

// ===== impl FecElem =====

impl FecElem {
    pub fn get_type(&self) -> u8 {
        match self {
            FecElem::Wildcard => TLV_FEC_ELEMENT_WILDCARD,
            FecElem::Prefix(_) => TLV_FEC_ELEMENT_PREFIX,
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.get_type());
        if let FecElem::Prefix(prefix) = self {
            buf.put_u16(AddressFamily::Ipv4 as u16);
            buf.put_u8(prefix.prefix());
            buf.put_ipv4(&prefix.network());
        }
    }

    fn decode(buf: &mut Bytes) -> DecodeResult<FecElem> {
        let fec_elem_type = buf.try_get_u8()?;
        let decode_fn = FecElem::decoder(fec_elem_type)
            .ok_or(DecodeError::UnknownFec(fec_elem_type))?;
        (decode_fn)(buf)
    }

    fn decoder(fec_elem_type: u8) -> Option<FecElemDecodeFn> {
        match fec_elem_type {
            TLV_FEC_ELEMENT_WILDCARD => Some(FecElem::decode_wildcard),
            TLV_FEC_ELEMENT_PREFIX => Some(FecElem::decode_prefix),
            _ => None,
        }
    }

    fn decode_wildcard(_buf: &mut Bytes) -> DecodeResult<FecElem> {
        Ok(FecElem::Wildcard)
    }

    fn decode_prefix(buf: &mut Bytes) -> DecodeResult<FecElem> {
        let af = buf.try_get_u16()?;
        if af != AddressFamily::Ipv4 as u16 {
            return Err(DecodeError::UnsupportedAf(af));
        }
        let plen = buf.try_get_u8()?;
        if plen > Ipv4Network::MAX_PREFIXLEN {
            return Err(DecodeError::InvalidPrefixLength(plen));
        }
        let addr: Ipv4Addr = buf.try_get_ipv4()?;

        let prefix = Ipv4Network::new(addr, plen)
            .map_err(|_| DecodeError::InvalidPrefixLength(plen))?;
        Ok(FecElem::Prefix(prefix.apply_mask()))
    }
}

impl From<Ipv4Network> for FecElem {
    fn from(prefix: Ipv4Network) -> FecElem {
        FecElem::Prefix(prefix)
    }
}
