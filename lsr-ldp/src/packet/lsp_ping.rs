//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! MPLS LSP-ping echo packets (RFC 8029).
//!
//! Only the wire codec is provided. Echo TLVs use the same type/length framing
//! as LDP TLVs, and TLVs this codec doesn't interpret are kept opaque and
//! re-encoded byte-for-byte.

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use ipnetwork::Ipv4Network;
use lsr_utils::bytes::{BytesExt, BytesMutExt, TLS_BUF};
use lsr_utils::ip::Ipv4NetworkExt;
use lsr_utils::mpls::Label;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::tlv::{self, TLV_HDR_SIZE, TlvUnknown};

//
// MPLS echo request/reply.
//
// Encoding format:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |       Version Number          |         Global Flags          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Message Type |   Reply Mode  |  Return Code  | Return Subcode|
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                        Sender's Handle                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                        Sequence Number                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    TimeStamp Sent (seconds)                   |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                  TimeStamp Sent (seconds fraction)            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                  TimeStamp Received (seconds)                 |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                TimeStamp Received (seconds fraction)          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                            TLVs ...                           |
// .                                                               .
// .                                                               .
// .                                                               .
// |                                                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EchoPacket {
    pub version: u16,
    pub global_flags: EchoFlags,
    pub msg_type: EchoMsgType,
    pub reply_mode: ReplyMode,
    pub return_code: u8,
    pub return_subcode: u8,
    pub senders_handle: u32,
    pub seq_num: u32,
    pub timestamp_sent: EchoTimestamp,
    pub timestamp_rcvd: EchoTimestamp,
    pub tlvs: Vec<EchoTlv>,
}

// Global flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct EchoFlags: u16 {
        const VALIDATE_FEC_STACK = 0x0001;
        const RESPOND_TTL_EXPIRED = 0x0002;
        const VALIDATE_REVERSE_PATH = 0x0004;
    }
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum EchoMsgType {
    EchoRequest = 1,
    EchoReply = 2,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum ReplyMode {
    DoNotReply = 1,
    UdpPacket = 2,
    UdpRouterAlert = 3,
    ApplicationControlChannel = 4,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EchoTimestamp {
    pub sec: u32,
    pub usec: u32,
}

// Echo TLVs.
//
// IANA registry:
// https://www.iana.org/assignments/mpls-lsp-ping-parameters/mpls-lsp-ping-parameters.xhtml#tlvs
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum EchoTlv {
    TargetFecStack(Vec<FecStackSubTlv>),
    Pad(Bytes),
    VendorEnterprise(u32),
    ErroredTlvs(Vec<TlvUnknown>),
    ReplyTos(u8),
    Unknown(TlvUnknown),
}

// Target FEC Stack sub-TLVs.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FecStackSubTlv {
    LdpIpv4Prefix(Ipv4Network),
    NilFec(Label),
    Unknown(TlvUnknown),
}

pub const ECHO_TLV_TARGET_FEC_STACK: u16 = 1;
pub const ECHO_TLV_PAD: u16 = 3;
pub const ECHO_TLV_VENDOR_ENTERPRISE: u16 = 5;
pub const ECHO_TLV_ERRORED_TLVS: u16 = 9;
pub const ECHO_TLV_REPLY_TOS: u16 = 10;

pub const FEC_SUB_TLV_LDP_IPV4_PREFIX: u16 = 1;
pub const FEC_SUB_TLV_NIL_FEC: u16 = 16;

// ===== impl EchoPacket =====

impl EchoPacket {
    pub const VERSION: u16 = 1;
    pub const HDR_SIZE: usize = 32;

    pub fn encode(&self) -> BytesMut {
        TLS_BUF.with(|buf| {
            let mut buf = buf.borrow_mut();
            buf.clear();

            buf.put_u16(self.version);
            buf.put_u16(self.global_flags.bits());
            buf.put_u8(self.msg_type as u8);
            buf.put_u8(self.reply_mode as u8);
            buf.put_u8(self.return_code);
            buf.put_u8(self.return_subcode);
            buf.put_u32(self.senders_handle);
            buf.put_u32(self.seq_num);
            self.timestamp_sent.encode(&mut buf);
            self.timestamp_rcvd.encode(&mut buf);
            for tlv in &self.tlvs {
                tlv.encode(&mut buf);
            }

            buf.clone()
        })
    }

    pub fn decode(data: &[u8]) -> DecodeResult<Self> {
        let mut buf = Bytes::copy_from_slice(data);

        let version = buf.try_get_u16()?;
        if version != EchoPacket::VERSION {
            return Err(DecodeError::InvalidVersion(version));
        }
        let global_flags = EchoFlags::from_bits_retain(buf.try_get_u16()?);
        let msg_type = buf.try_get_u8()?;
        let msg_type = EchoMsgType::from_u8(msg_type)
            .ok_or(DecodeError::InvalidEchoMsgType(msg_type))?;
        let reply_mode = buf.try_get_u8()?;
        let reply_mode = ReplyMode::from_u8(reply_mode)
            .ok_or(DecodeError::InvalidReplyMode(reply_mode))?;
        let return_code = buf.try_get_u8()?;
        let return_subcode = buf.try_get_u8()?;
        let senders_handle = buf.try_get_u32()?;
        let seq_num = buf.try_get_u32()?;
        let timestamp_sent = EchoTimestamp::decode(&mut buf)?;
        let timestamp_rcvd = EchoTimestamp::decode(&mut buf)?;

        let mut tlvs = vec![];
        while buf.has_remaining() {
            tlvs.push(EchoTlv::decode(&mut buf)?);
        }

        Ok(EchoPacket {
            version,
            global_flags,
            msg_type,
            reply_mode,
            return_code,
            return_subcode,
            senders_handle,
            seq_num,
            timestamp_sent,
            timestamp_rcvd,
            tlvs,
        })
    }
}

// ===== impl EchoTimestamp =====

impl EchoTimestamp {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sec);
        buf.put_u32(self.usec);
    }

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        let sec = buf.try_get_u32()?;
        let usec = buf.try_get_u32()?;
        Ok(EchoTimestamp { sec, usec })
    }
}

// ===== impl EchoTlv =====

impl EchoTlv {
    fn tlv_type(&self) -> u16 {
        match self {
            EchoTlv::TargetFecStack(_) => ECHO_TLV_TARGET_FEC_STACK,
            EchoTlv::Pad(_) => ECHO_TLV_PAD,
            EchoTlv::VendorEnterprise(_) => ECHO_TLV_VENDOR_ENTERPRISE,
            EchoTlv::ErroredTlvs(_) => ECHO_TLV_ERRORED_TLVS,
            EchoTlv::ReplyTos(_) => ECHO_TLV_REPLY_TOS,
            EchoTlv::Unknown(tlv) => tlv.tlv_type,
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        if let EchoTlv::Unknown(tlv) = self {
            tlv.encode(buf);
            return;
        }

        let start_pos = buf.len();
        buf.put_u16(self.tlv_type());
        // The TLV length will be rewritten later.
        buf.put_u16(0);

        match self {
            EchoTlv::TargetFecStack(sub_tlvs) => {
                for sub_tlv in sub_tlvs {
                    sub_tlv.encode(buf);
                }
            }
            EchoTlv::Pad(value) => buf.put_slice(value),
            EchoTlv::VendorEnterprise(number) => buf.put_u32(*number),
            EchoTlv::ErroredTlvs(tlvs) => {
                for tlv in tlvs {
                    tlv.encode(buf);
                }
            }
            EchoTlv::ReplyTos(tos) => {
                buf.put_u8(*tos);
                // MBZ.
                buf.put_slice(&[0; 3]);
            }
            // Encoded verbatim above.
            EchoTlv::Unknown(_) => (),
        }

        let tlv_len = (buf.len() - start_pos) as u16 - TLV_HDR_SIZE;
        buf.rewrite_u16(start_pos + 2, tlv_len);
    }

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        let (tlv_type, mut value) = tlv::decode_tlv_raw(buf)?;
        let tlv_len = value.len() as u16;

        let tlv = match tlv_type {
            ECHO_TLV_TARGET_FEC_STACK => {
                let mut sub_tlvs = vec![];
                while value.has_remaining() {
                    sub_tlvs.push(FecStackSubTlv::decode(&mut value)?);
                }
                EchoTlv::TargetFecStack(sub_tlvs)
            }
            ECHO_TLV_PAD => EchoTlv::Pad(value),
            ECHO_TLV_VENDOR_ENTERPRISE => {
                if tlv_len != 4 {
                    return Err(DecodeError::InvalidTlvLength(tlv_len));
                }
                EchoTlv::VendorEnterprise(value.try_get_u32()?)
            }
            ECHO_TLV_ERRORED_TLVS => {
                let mut tlvs = vec![];
                while value.has_remaining() {
                    let (tlv_type, value) = tlv::decode_tlv_raw(&mut value)?;
                    tlvs.push(TlvUnknown::new(tlv_type, value));
                }
                EchoTlv::ErroredTlvs(tlvs)
            }
            ECHO_TLV_REPLY_TOS => {
                if tlv_len != 4 {
                    return Err(DecodeError::InvalidTlvLength(tlv_len));
                }
                EchoTlv::ReplyTos(value.try_get_u8()?)
            }
            _ => EchoTlv::Unknown(TlvUnknown::new(tlv_type, value)),
        };

        Ok(tlv)
    }
}

// ===== impl FecStackSubTlv =====

impl FecStackSubTlv {
    //
    // LDP IPv4 prefix sub-TLV value:
    //
    //  0                   1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                          IPv4 prefix                          |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Prefix Length |         Must Be Zero                          |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //
    const LDP_IPV4_PREFIX_LEN: u16 = 8;
    const NIL_FEC_LEN: u16 = 4;
    const LABEL_SHIFT: u32 = 12;

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            FecStackSubTlv::LdpIpv4Prefix(prefix) => {
                buf.put_u16(FEC_SUB_TLV_LDP_IPV4_PREFIX);
                buf.put_u16(Self::LDP_IPV4_PREFIX_LEN);
                buf.put_ipv4(&prefix.network());
                buf.put_u8(prefix.prefix());
                buf.put_slice(&[0; 3]);
            }
            FecStackSubTlv::NilFec(label) => {
                buf.put_u16(FEC_SUB_TLV_NIL_FEC);
                buf.put_u16(Self::NIL_FEC_LEN);
                buf.put_u32(label.get() << Self::LABEL_SHIFT);
            }
            FecStackSubTlv::Unknown(tlv) => tlv.encode(buf),
        }
    }

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        let (tlv_type, mut value) = tlv::decode_tlv_raw(buf)?;
        let tlv_len = value.len() as u16;

        let sub_tlv = match tlv_type {
            FEC_SUB_TLV_LDP_IPV4_PREFIX => {
                if tlv_len != Self::LDP_IPV4_PREFIX_LEN {
                    return Err(DecodeError::InvalidTlvLength(tlv_len));
                }
                let addr = value.try_get_ipv4()?;
                let plen = value.try_get_u8()?;
                if plen > Ipv4Network::MAX_PREFIXLEN {
                    return Err(DecodeError::InvalidPrefixLength(plen));
                }
                let prefix = Ipv4Network::new(addr, plen)
                    .map_err(|_| DecodeError::InvalidPrefixLength(plen))?;
                FecStackSubTlv::LdpIpv4Prefix(prefix.apply_mask())
            }
            FEC_SUB_TLV_NIL_FEC => {
                if tlv_len != Self::NIL_FEC_LEN {
                    return Err(DecodeError::InvalidTlvLength(tlv_len));
                }
                let word = value.try_get_u32()?;
                FecStackSubTlv::NilFec(Label::from_masked(
                    word >> Self::LABEL_SHIFT,
                ))
            }
            _ => FecStackSubTlv::Unknown(TlvUnknown::new(tlv_type, value)),
        };

        Ok(sub_tlv)
    }
}
