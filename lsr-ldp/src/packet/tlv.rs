//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use lsr_utils::bytes::{BytesExt, BytesMutExt};
use lsr_utils::ip::{AddressFamily, Ipv4AddrExt};
use lsr_utils::mpls::Label;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::packet::DecodeCxt;
use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::fec::TlvFec;
use crate::packet::message::{Message, MessageType};
use crate::packet::params::{HelloParams, SessionParams};
use crate::packet::pdu::Pdu;
use crate::packet::status::Status;

//
// TLV header:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |U|F|        Type               |            Length             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// `Length` covers the value only. LSP-ping TLVs use the same header with a
// plain 16-bit type.
//
pub const TLV_HDR_SIZE: u16 = 4;
pub const TLV_UNKNOWN_FLAG: u16 = 0x8000;
pub const TLV_FORWARD_FLAG: u16 = 0x4000;
pub const TLV_TYPE_MASK: u16 = 0x3FFF;

// TLV types with a dedicated value codec.
//
// IANA registry:
// https://www.iana.org/assignments/ldp-namespaces/ldp-namespaces.xhtml#ldp-namespaces-4
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum TlvType {
    Fec = 0x0100,
    AddrList = 0x0101,
    GenericLabel = 0x0200,
    Status = 0x0300,
    ExtStatus = 0x0301,
    ReturnedPdu = 0x0302,
    ReturnedMsg = 0x0303,
    CommonHelloParams = 0x0400,
    Ipv4TransAddr = 0x0401,
    ConfigSeqNo = 0x0402,
    CommonSessParams = 0x0500,
    LabelRequestId = 0x0600,
}

// A single message parameter.
//
// A message holds its TLVs in the order they appear on the wire. Types
// without a registered decoder become `Tlv::Unknown` and are written back
// exactly where they were found.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Tlv {
    Fec(TlvFec),
    AddrList(Vec<Ipv4Addr>),
    Label(Label),
    Status(Status),
    ExtStatus(u32),
    ReturnedPdu(Bytes),
    ReturnedMsg(Bytes),
    HelloParams(HelloParams),
    TransportAddr(Ipv4Addr),
    ConfigSeqNo(u32),
    SessionParams(SessionParams),
    LabelRequestId(u32),
    Unknown(TlvUnknown),
}

// Opaque TLV. The type word keeps the U and F bits as received.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TlvUnknown {
    pub tlv_type: u16,
    pub value: Bytes,
}

// Value decoder registered for a TLV type. `buf` holds exactly the value.
pub type TlvDecodeFn = fn(&mut Bytes, &DecodeCxt) -> DecodeResult<Tlv>;

// ===== impl TlvType =====

impl TlvType {
    pub(crate) fn decode(value: u16) -> Option<Self> {
        TlvType::from_u16(value & TLV_TYPE_MASK)
    }

    pub(crate) fn decoder(self) -> TlvDecodeFn {
        match self {
            TlvType::Fec => decode_fec,
            TlvType::AddrList => decode_addr_list,
            TlvType::GenericLabel => decode_label,
            TlvType::Status => decode_status,
            TlvType::ExtStatus => decode_ext_status,
            TlvType::ReturnedPdu => decode_returned_pdu,
            TlvType::ReturnedMsg => decode_returned_msg,
            TlvType::CommonHelloParams => decode_hello_params,
            TlvType::Ipv4TransAddr => decode_trans_addr,
            TlvType::ConfigSeqNo => decode_cfg_seqno,
            TlvType::CommonSessParams => decode_sess_params,
            TlvType::LabelRequestId => decode_request_id,
        }
    }
}

impl std::fmt::Display for TlvType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#06x})", self, *self as u16)
    }
}

// ===== impl Tlv =====

impl Tlv {
    // Registered type of this TLV, `None` for opaque ones.
    pub fn tlv_type(&self) -> Option<TlvType> {
        let tlv_type = match self {
            Tlv::Fec(_) => TlvType::Fec,
            Tlv::AddrList(_) => TlvType::AddrList,
            Tlv::Label(_) => TlvType::GenericLabel,
            Tlv::Status(_) => TlvType::Status,
            Tlv::ExtStatus(_) => TlvType::ExtStatus,
            Tlv::ReturnedPdu(_) => TlvType::ReturnedPdu,
            Tlv::ReturnedMsg(_) => TlvType::ReturnedMsg,
            Tlv::HelloParams(_) => TlvType::CommonHelloParams,
            Tlv::TransportAddr(_) => TlvType::Ipv4TransAddr,
            Tlv::ConfigSeqNo(_) => TlvType::ConfigSeqNo,
            Tlv::SessionParams(_) => TlvType::CommonSessParams,
            Tlv::LabelRequestId(_) => TlvType::LabelRequestId,
            Tlv::Unknown(_) => return None,
        };
        Some(tlv_type)
    }

    // Header type word, U and F bits included.
    fn type_word(&self, msg_type: MessageType) -> u16 {
        match self {
            Tlv::Unknown(tlv) => tlv.tlv_type,
            Tlv::Status(status) => status.type_word(msg_type),
            _ => self.tlv_type().map_or(0, |tlv_type| tlv_type as u16),
        }
    }

    pub(crate) fn encode(&self, msg_type: MessageType, buf: &mut BytesMut) {
        let start_pos = buf.len();
        buf.put_u16(self.type_word(msg_type));
        // Length placeholder.
        buf.put_u16(0);

        match self {
            Tlv::Fec(fec) => fec.encode(buf),
            Tlv::AddrList(addrs) => {
                buf.put_u16(AddressFamily::Ipv4 as u16);
                for addr in addrs {
                    buf.put_ipv4(addr);
                }
            }
            Tlv::Label(label) => buf.put_u32(label.get()),
            Tlv::Status(status) => status.encode(buf),
            Tlv::ExtStatus(value)
            | Tlv::ConfigSeqNo(value)
            | Tlv::LabelRequestId(value) => buf.put_u32(*value),
            Tlv::ReturnedPdu(data) | Tlv::ReturnedMsg(data) => {
                buf.put_slice(data)
            }
            Tlv::HelloParams(params) => params.encode(buf),
            Tlv::TransportAddr(addr) => buf.put_ipv4(addr),
            Tlv::SessionParams(params) => params.encode(buf),
            Tlv::Unknown(tlv) => buf.put_slice(&tlv.value),
        }

        let tlv_len = (buf.len() - start_pos) as u16 - TLV_HDR_SIZE;
        buf.rewrite_u16(start_pos + 2, tlv_len);
    }

    // Decodes the TLV at the head of a message body.
    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
    ) -> DecodeResult<Tlv> {
        let (tlv_type, mut value) = decode_tlv_raw(buf)?;
        match TlvType::decode(tlv_type) {
            Some(known) => (known.decoder())(&mut value, cxt),
            None => Ok(Tlv::Unknown(TlvUnknown::new(tlv_type, value))),
        }
    }
}

impl From<TlvFec> for Tlv {
    fn from(fec: TlvFec) -> Tlv {
        Tlv::Fec(fec)
    }
}

impl From<HelloParams> for Tlv {
    fn from(params: HelloParams) -> Tlv {
        Tlv::HelloParams(params)
    }
}

impl From<SessionParams> for Tlv {
    fn from(params: SessionParams) -> Tlv {
        Tlv::SessionParams(params)
    }
}

impl From<Status> for Tlv {
    fn from(status: Status) -> Tlv {
        Tlv::Status(status)
    }
}

impl From<TlvUnknown> for Tlv {
    fn from(tlv: TlvUnknown) -> Tlv {
        Tlv::Unknown(tlv)
    }
}

// ===== impl TlvUnknown =====

impl TlvUnknown {
    pub fn new(tlv_type: u16, value: Bytes) -> TlvUnknown {
        TlvUnknown { tlv_type, value }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.tlv_type);
        buf.put_u16(self.value.len() as u16);
        buf.put_slice(&self.value);
    }
}

// ===== value decoders =====

fn decode_fec(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    TlvFec::decode(buf).map(Tlv::Fec)
}

fn decode_addr_list(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    let tlv_len = buf.len() as u16;
    if buf.len() < 2 {
        return Err(DecodeError::InvalidTlvLength(tlv_len));
    }

    let af = buf.try_get_u16()?;
    if AddressFamily::from_u16(af) != Some(AddressFamily::Ipv4) {
        return Err(DecodeError::UnsupportedAf(af));
    }
    if buf.len() % Ipv4Addr::LENGTH != 0 {
        return Err(DecodeError::InvalidTlvLength(tlv_len));
    }

    let mut addrs = Vec::with_capacity(buf.len() / Ipv4Addr::LENGTH);
    while buf.has_remaining() {
        addrs.push(buf.try_get_ipv4()?);
    }
    Ok(Tlv::AddrList(addrs))
}

fn decode_label(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    let value = decode_u32(buf)?;

    // Of the reserved values, only the null labels can be advertised.
    Label::new(value)
        .filter(|label| {
            !label.is_reserved()
                || matches!(
                    label.get(),
                    Label::IPV4_EXPLICIT_NULL
                        | Label::IPV6_EXPLICIT_NULL
                        | Label::IMPLICIT_NULL
                )
        })
        .map(Tlv::Label)
        .ok_or(DecodeError::InvalidTlvValue(TlvType::GenericLabel))
}

fn decode_status(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    Status::decode(buf).map(Tlv::Status)
}

fn decode_ext_status(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    decode_u32(buf).map(Tlv::ExtStatus)
}

fn decode_returned_pdu(
    buf: &mut Bytes,
    _cxt: &DecodeCxt,
) -> DecodeResult<Tlv> {
    if buf.len() < Pdu::HDR_SIZE as usize {
        return Err(DecodeError::InvalidTlvLength(buf.len() as u16));
    }
    Ok(Tlv::ReturnedPdu(buf.split_to(buf.len())))
}

fn decode_returned_msg(
    buf: &mut Bytes,
    _cxt: &DecodeCxt,
) -> DecodeResult<Tlv> {
    if buf.len() < Message::HDR_DEAD_LEN as usize {
        return Err(DecodeError::InvalidTlvLength(buf.len() as u16));
    }
    Ok(Tlv::ReturnedMsg(buf.split_to(buf.len())))
}

fn decode_hello_params(buf: &mut Bytes, cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    HelloParams::decode(buf, cxt).map(Tlv::HelloParams)
}

fn decode_trans_addr(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    expect_len(buf, Ipv4Addr::LENGTH)?;
    let addr = buf.try_get_ipv4()?;
    if !addr.is_usable() {
        return Err(DecodeError::InvalidTransportAddr(addr));
    }
    Ok(Tlv::TransportAddr(addr))
}

fn decode_cfg_seqno(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    decode_u32(buf).map(Tlv::ConfigSeqNo)
}

fn decode_sess_params(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    SessionParams::decode(buf).map(Tlv::SessionParams)
}

fn decode_request_id(buf: &mut Bytes, _cxt: &DecodeCxt) -> DecodeResult<Tlv> {
    decode_u32(buf).map(Tlv::LabelRequestId)
}

fn decode_u32(buf: &mut Bytes) -> DecodeResult<u32> {
    expect_len(buf, 4)?;
    Ok(buf.try_get_u32()?)
}

// ===== global functions =====

// Fails unless a fixed-size value has exactly `len` bytes.
pub(crate) fn expect_len(buf: &Bytes, len: usize) -> DecodeResult<()> {
    if buf.len() != len {
        return Err(DecodeError::InvalidTlvLength(buf.len() as u16));
    }
    Ok(())
}

// Splits the next TLV off `buf`, returning its raw type word and its value.
//
// The value is cut at the declared length, so a decoder that leaves bytes
// unread can't shift the start of the following TLV.
pub(crate) fn decode_tlv_raw(buf: &mut Bytes) -> DecodeResult<(u16, Bytes)> {
    let tlv_type = buf.try_get_u16()?;
    let tlv_len = buf.try_get_u16()?;
    let value = buf.try_split_to(tlv_len as usize)?;
    Ok((tlv_type, value))
}
