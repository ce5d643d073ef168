//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use lsr_utils::bytes::{BytesExt, BytesMutExt};
use lsr_utils::mpls::Label;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::packet::DecodeCxt;
use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::fec::{FecElem, TLV_FEC_ELEMENT_WILDCARD, TlvFec};
use crate::packet::params::{HelloParams, SessionParams};
use crate::packet::status::{Status, StatusCode};
use crate::packet::tlv::{Tlv, TlvType, TlvUnknown};

//
// LDP message:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |U|   Message Type              |      Message Length           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     Message ID                                |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     TLVs ...                                  |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// `tlvs` is the parameter list exactly as ordered on the wire. Decoding
// checks that the mandatory TLV of the message type comes first; encoding
// writes the list back in order and recomputes every length field.
//
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Message {
    pub msg_type: MessageType,
    pub msg_id: u32,
    pub tlvs: Vec<Tlv>,
}

// Message types.
//
// IANA registry:
// https://www.iana.org/assignments/ldp-namespaces/ldp-namespaces.xhtml#ldp-namespaces-2
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum MessageType {
    Notification = 0x0001,
    Hello = 0x0100,
    Initialization = 0x0200,
    Keepalive = 0x0201,
    Address = 0x0300,
    AddressWithdraw = 0x0301,
    LabelMapping = 0x0400,
    LabelRequest = 0x0401,
    LabelWithdraw = 0x0402,
    LabelRelease = 0x0403,
    LabelAbortReq = 0x0404,
}

// ===== impl Message =====

impl Message {
    pub const HDR_SIZE: u16 = 8;
    pub const HDR_MIN_LEN: u16 = 4;
    pub const HDR_DEAD_LEN: u16 = 4;
    pub const UNKNOWN_FLAG: u16 = 0x8000;
    pub const TYPE_MASK: u16 = 0x7FFF;

    pub fn new(msg_type: MessageType, msg_id: u32) -> Message {
        Message {
            msg_type,
            msg_id,
            tlvs: Vec::new(),
        }
    }

    // Appends a TLV after the ones already present.
    pub fn with_tlv(mut self, tlv: impl Into<Tlv>) -> Message {
        self.tlvs.push(tlv.into());
        self
    }

    pub fn keepalive(msg_id: u32) -> Message {
        Message::new(MessageType::Keepalive, msg_id)
    }

    // Notification carrying `code`, optionally naming the message it's about.
    pub fn notification(
        msg_id: u32,
        code: StatusCode,
        about: Option<(u32, MessageType)>,
    ) -> Message {
        Message::new(MessageType::Notification, msg_id)
            .with_tlv(Status::new(code, about))
    }

    pub fn hello_params(&self) -> Option<&HelloParams> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::HelloParams(params) => Some(params),
            _ => None,
        })
    }

    // Only the first transport address counts.
    pub fn transport_addr(&self) -> Option<Ipv4Addr> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::TransportAddr(addr) => Some(*addr),
            _ => None,
        })
    }

    pub fn session_params(&self) -> Option<&SessionParams> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::SessionParams(params) => Some(params),
            _ => None,
        })
    }

    pub fn addr_list(&self) -> &[Ipv4Addr] {
        self.tlvs
            .iter()
            .find_map(|tlv| match tlv {
                Tlv::AddrList(addrs) => Some(addrs.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn fec(&self) -> Option<&TlvFec> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::Fec(fec) => Some(fec),
            _ => None,
        })
    }

    pub fn label(&self) -> Option<Label> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::Label(label) => Some(*label),
            _ => None,
        })
    }

    pub fn request_id(&self) -> Option<u32> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::LabelRequestId(request_id) => Some(*request_id),
            _ => None,
        })
    }

    pub fn status(&self) -> Option<&Status> {
        self.tlvs.iter().find_map(|tlv| match tlv {
            Tlv::Status(status) => Some(status),
            _ => None,
        })
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.status().and_then(Status::status_code)
    }

    pub fn is_fatal_error(&self) -> bool {
        self.status().is_some_and(Status::is_fatal)
    }

    pub fn unknown_tlvs(&self) -> impl Iterator<Item = &TlvUnknown> {
        self.tlvs.iter().filter_map(|tlv| match tlv {
            Tlv::Unknown(tlv) => Some(tlv),
            _ => None,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let start_pos = buf.len();
        buf.put_u16(self.msg_type as u16);
        // Length placeholder.
        buf.put_u16(0);
        buf.put_u32(self.msg_id);

        for tlv in &self.tlvs {
            tlv.encode(self.msg_type, buf);
        }

        let msg_len = (buf.len() - start_pos) as u16 - Message::HDR_DEAD_LEN;
        buf.rewrite_u16(start_pos + 2, msg_len);
    }

    // Decodes the message at the head of a PDU body.
    //
    // Messages of unknown type are skipped when their U-bit is set.
    pub fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
    ) -> DecodeResult<Option<Message>> {
        let msg_type = buf.try_get_u16()?;
        let msg_len = buf.try_get_u16()?;
        if msg_len < Message::HDR_MIN_LEN {
            return Err(DecodeError::InvalidMessageLength(msg_len));
        }

        // TLVs are parsed from a view that ends with the message.
        let mut body = buf.try_split_to(msg_len as usize)?;
        let msg_id = body.try_get_u32()?;

        let Some(msg_type) = MessageType::decode(msg_type) else {
            if msg_type & Message::UNKNOWN_FLAG == 0 {
                return Err(DecodeError::UnknownMessage(msg_type));
            }
            return Ok(None);
        };

        let mut msg = Message::new(msg_type, msg_id);
        while body.has_remaining() {
            msg.tlvs.push(Tlv::decode(&mut body, cxt)?);
        }
        msg.validate()?;

        Ok(Some(msg))
    }

    fn validate(&self) -> DecodeResult<()> {
        if let Some(tlv_type) = self.msg_type.mandatory_tlv()
            && self.tlvs.first().and_then(Tlv::tlv_type) != Some(tlv_type)
        {
            return Err(DecodeError::MissingMsgParams(self.msg_type, tlv_type));
        }

        match self.fec() {
            Some(fec) if self.msg_type.is_label() => self.validate_label(fec),
            _ => Ok(()),
        }
    }

    fn validate_label(&self, fec: &TlvFec) -> DecodeResult<()> {
        let msg_type = self.msg_type;
        let missing =
            |tlv_type| DecodeError::MissingMsgParams(msg_type, tlv_type);

        match msg_type {
            MessageType::LabelMapping if self.label().is_none() => {
                return Err(missing(TlvType::GenericLabel));
            }
            MessageType::LabelAbortReq if self.request_id().is_none() => {
                return Err(missing(TlvType::LabelRequestId));
            }
            // RFC 5036 section 3.4.1: several FEC elements are allowed in
            // Label Mapping only.
            MessageType::LabelRequest
            | MessageType::LabelWithdraw
            | MessageType::LabelRelease
            | MessageType::LabelAbortReq
                if fec.0.len() > 1 =>
            {
                return Err(DecodeError::InvalidTlvValue(TlvType::Fec));
            }
            // RFC 5918 section 1: the Wildcard element is limited to Label
            // Withdraw and Label Release.
            MessageType::LabelMapping
            | MessageType::LabelRequest
            | MessageType::LabelAbortReq
                if fec.has_wildcard() =>
            {
                return Err(DecodeError::UnknownFec(TLV_FEC_ELEMENT_WILDCARD));
            }
            _ => (),
        }

        // IPv6 explicit null can't label an IPv4 prefix.
        if self.label().map(|label| label.get())
            == Some(Label::IPV6_EXPLICIT_NULL)
            && fec.0.iter().any(|elem| matches!(elem, FecElem::Prefix(_)))
        {
            return Err(DecodeError::InvalidTlvValue(TlvType::GenericLabel));
        }

        Ok(())
    }
}

// ===== impl MessageType =====

impl MessageType {
    pub(crate) fn decode(value: u16) -> Option<Self> {
        MessageType::from_u16(value & Message::TYPE_MASK)
    }

    // TLV that has to open the message, if any.
    pub fn mandatory_tlv(&self) -> Option<TlvType> {
        match self {
            MessageType::Notification => Some(TlvType::Status),
            MessageType::Hello => Some(TlvType::CommonHelloParams),
            MessageType::Initialization => Some(TlvType::CommonSessParams),
            MessageType::Keepalive => None,
            MessageType::Address | MessageType::AddressWithdraw => {
                Some(TlvType::AddrList)
            }
            MessageType::LabelMapping
            | MessageType::LabelRequest
            | MessageType::LabelWithdraw
            | MessageType::LabelRelease
            | MessageType::LabelAbortReq => Some(TlvType::Fec),
        }
    }

    pub fn is_label(&self) -> bool {
        self.mandatory_tlv() == Some(TlvType::Fec)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#06x})", self, *self as u16)
    }
}
