//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::packet::error::DecodeResult;
use crate::packet::message::MessageType;
use crate::packet::tlv::{self, TLV_FORWARD_FLAG, TLV_UNKNOWN_FLAG, TlvType};

//
// Status value:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |E|F|                 Status Data                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     Message ID                                |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |      Message Type             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// Message ID and type identify the message being reported on, or are zero.
//
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Status {
    pub code: u32,
    pub msg_id: u32,
    pub msg_type: u16,
}

// Status codes.
//
// IANA registry:
// https://www.iana.org/assignments/ldp-namespaces/ldp-namespaces.xhtml#status-codes
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum StatusCode {
    Success = 0x00,
    BadLdpId = 0x01,
    BadProtoVers = 0x02,
    BadPduLen = 0x03,
    UnknownMsgType = 0x04,
    BadMsgLen = 0x05,
    UnknownTlv = 0x06,
    BadTlvLen = 0x07,
    MalformedTlvValue = 0x08,
    HoldTimerExp = 0x09,
    Shutdown = 0x0A,
    LoopDetected = 0x0B,
    UnknownFec = 0x0C,
    NoRoute = 0x0D,
    NoLabelRes = 0x0E,
    LabelResAvailable = 0x0F,
    SessRejNoHello = 0x10,
    SessRejAdvMode = 0x11,
    SessRejMaxPduLen = 0x12,
    SessRejLabelRange = 0x13,
    KeepaliveExp = 0x14,
    LabelReqAbrt = 0x15,
    MissingMsgParams = 0x16,
    UnsupportedAf = 0x17,
    SessRejKeepalive = 0x18,
    InternalError = 0x19,
}

// ===== impl Status =====

impl Status {
    const LENGTH: usize = 10;
    const E_FLAG: u32 = 0x8000_0000;
    const F_FLAG: u32 = 0x4000_0000;
    const CODE_MASK: u32 = 0x3FFF_FFFF;

    pub fn new(code: StatusCode, about: Option<(u32, MessageType)>) -> Status {
        let (msg_id, msg_type) = about
            .map(|(msg_id, msg_type)| (msg_id, msg_type as u16))
            .unwrap_or_default();
        let mut value = code as u32;
        if code.is_fatal_error() {
            value |= Self::E_FLAG;
        }

        Status {
            code: value,
            msg_id,
            msg_type,
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u32(self.code & Self::CODE_MASK)
    }

    // E-bit: the sender is closing the session.
    pub fn is_fatal(&self) -> bool {
        self.code & Self::E_FLAG != 0
    }

    // RFC 5036 section 3.4.6: U is clear only inside a Notification and F
    // follows the F bit of the status code.
    pub(crate) fn type_word(&self, msg_type: MessageType) -> u16 {
        let mut word = TlvType::Status as u16;
        if msg_type != MessageType::Notification {
            word |= TLV_UNKNOWN_FLAG;
        }
        if self.code & Self::F_FLAG != 0 {
            word |= TLV_FORWARD_FLAG;
        }
        word
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.code);
        buf.put_u32(self.msg_id);
        buf.put_u16(self.msg_type);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<Status> {
        tlv::expect_len(buf, Self::LENGTH)?;
        Ok(Status {
            code: buf.try_get_u32()?,
            msg_id: buf.try_get_u32()?,
            msg_type: buf.try_get_u16()?,
        })
    }
}

// ===== impl StatusCode =====

impl StatusCode {
    // Codes that always tear the session down.
    pub fn is_fatal_error(&self) -> bool {
        matches!(
            self,
            StatusCode::BadLdpId
                | StatusCode::BadProtoVers
                | StatusCode::BadPduLen
                | StatusCode::BadMsgLen
                | StatusCode::BadTlvLen
                | StatusCode::MalformedTlvValue
                | StatusCode::HoldTimerExp
                | StatusCode::Shutdown
                | StatusCode::SessRejNoHello
                | StatusCode::SessRejAdvMode
                | StatusCode::SessRejMaxPduLen
                | StatusCode::SessRejLabelRange
                | StatusCode::KeepaliveExp
                | StatusCode::SessRejKeepalive
                | StatusCode::InternalError
        )
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#04x})", self, *self as u32)
    }
}
