//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bytes::TryGetError;
use serde::{Deserialize, Serialize};

use crate::packet::message::MessageType;
use crate::packet::status::StatusCode;
use crate::packet::tlv::TlvType;

pub type DecodeResult<T> = Result<T, DecodeError>;

// Errors raised while decoding LDP and LSP-ping packets.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum DecodeError {
    // A length field promises more bytes than there are.
    TruncatedInput,
    // Stream framing only: the PDU isn't complete yet.
    IncompletePdu,
    InvalidPduLength(u16),
    InvalidVersion(u16),
    InvalidLsrId(Ipv4Addr),
    InvalidLabelSpace(u16),
    InvalidMessageLength(u16),
    UnknownMessage(u16),
    MissingMsgParams(MessageType, TlvType),
    InvalidTlvLength(u16),
    InvalidTlvValue(TlvType),
    MalformedFec,
    InvalidPrefixLength(u8),
    UnknownFec(u8),
    UnsupportedAf(u16),
    BadKeepaliveTime(u16),
    McastTHello(Ipv4Addr),
    InvalidTransportAddr(Ipv4Addr),
    InvalidEchoMsgType(u8),
    InvalidReplyMode(u8),
}

// ===== impl DecodeError =====

impl DecodeError {
    // Status code reported to the peer whose PDU failed to decode.
    pub fn status_code(&self) -> StatusCode {
        use DecodeError::*;

        match self {
            IncompletePdu | InvalidPduLength(_) => StatusCode::BadPduLen,
            InvalidVersion(_) => StatusCode::BadProtoVers,
            InvalidLsrId(_) | InvalidLabelSpace(_) => StatusCode::BadLdpId,
            TruncatedInput | InvalidMessageLength(_) => StatusCode::BadMsgLen,
            UnknownMessage(_) => StatusCode::UnknownMsgType,
            MissingMsgParams(..) => StatusCode::MissingMsgParams,
            InvalidTlvLength(_) => StatusCode::BadTlvLen,
            UnknownFec(_) => StatusCode::UnknownFec,
            UnsupportedAf(_) => StatusCode::UnsupportedAf,
            BadKeepaliveTime(_) => StatusCode::SessRejKeepalive,
            InvalidTlvValue(_)
            | MalformedFec
            | InvalidPrefixLength(_)
            | McastTHello(_)
            | InvalidTransportAddr(_) => StatusCode::MalformedTlvValue,
            // LSP-ping errors never reach a session.
            InvalidEchoMsgType(_) | InvalidReplyMode(_) => {
                StatusCode::InternalError
            }
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::TruncatedInput => f.write_str("input ends early"),
            DecodeError::IncompletePdu => f.write_str("PDU not complete yet"),
            DecodeError::InvalidPduLength(len) => {
                write!(f, "bad PDU length {len}")
            }
            DecodeError::InvalidVersion(version) => {
                write!(f, "unsupported protocol version {version}")
            }
            DecodeError::InvalidLsrId(lsr_id) => {
                write!(f, "unexpected LSR-ID {lsr_id}")
            }
            DecodeError::InvalidLabelSpace(lspace) => {
                write!(f, "unexpected label space {lspace}")
            }
            DecodeError::InvalidMessageLength(len) => {
                write!(f, "bad message length {len}")
            }
            DecodeError::UnknownMessage(msg_type) => {
                write!(f, "message type {msg_type:#06x} not understood")
            }
            DecodeError::MissingMsgParams(msg_type, tlv_type) => {
                write!(f, "{msg_type} without mandatory TLV {tlv_type}")
            }
            DecodeError::InvalidTlvLength(len) => {
                write!(f, "bad TLV length {len}")
            }
            DecodeError::InvalidTlvValue(tlv_type) => {
                write!(f, "bad value in TLV {tlv_type}")
            }
            DecodeError::MalformedFec => f.write_str("FEC TLV is empty"),
            DecodeError::InvalidPrefixLength(plen) => {
                write!(f, "prefix length {plen} out of range")
            }
            DecodeError::UnknownFec(fec_type) => {
                write!(f, "FEC element type {fec_type} not accepted")
            }
            DecodeError::UnsupportedAf(af) => {
                write!(f, "address family {af} not supported")
            }
            DecodeError::BadKeepaliveTime(time) => {
                write!(f, "KeepAlive time {time} rejected")
            }
            DecodeError::McastTHello(addr) => {
                write!(f, "targeted Hello from {addr} sent to multicast")
            }
            DecodeError::InvalidTransportAddr(addr) => {
                write!(f, "unusable transport address {addr}")
            }
            DecodeError::InvalidEchoMsgType(msg_type) => {
                write!(f, "echo message type {msg_type} not understood")
            }
            DecodeError::InvalidReplyMode(mode) => {
                write!(f, "echo reply mode {mode} not understood")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<TryGetError> for DecodeError {
    fn from(_error: TryGetError) -> DecodeError {
        DecodeError::TruncatedInput
    }
}
