//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use lsr_utils::bytes::{BytesExt, BytesMutExt};
use serde::{Deserialize, Serialize};

use crate::packet::DecodeCxt;
use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::pdu::Pdu;
use crate::packet::tlv;

//
// Common Hello Parameters value:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |      Hold Time                |T|R|         Reserved          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct HelloParams {
    pub holdtime: u16,
    pub flags: HelloFlags,
}

// The whole flags word is kept, reserved bits included.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct HelloFlags: u16 {
        const TARGETED = 0x8000;
        const REQ_TARGETED = 0x4000;
    }
}

//
// Common Session Parameters value:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// | Protocol Version              |      KeepAlive Time           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |A|D|  Reserved |     PVLim     |      Max PDU Length           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |           Receiver LSR-ID and label space (6 octets)          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SessionParams {
    pub version: u16,
    pub keepalive_time: u16,
    pub flags: SessionFlags,
    pub pvlim: u8,
    pub max_pdu_len: u16,
    pub lsr_id: Ipv4Addr,
    pub lspace_id: u16,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct SessionFlags: u8 {
        // Downstream on Demand advertisement.
        const ADV_DISCIPLINE = 0x80;
        const LOOP_DETECTION = 0x40;
    }
}

// ===== impl HelloParams =====

impl HelloParams {
    pub const INFINITE_HOLDTIME: u16 = u16::MAX;
    const LENGTH: usize = 4;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.holdtime);
        buf.put_u16(self.flags.bits());
    }

    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
    ) -> DecodeResult<HelloParams> {
        tlv::expect_len(buf, Self::LENGTH)?;
        let holdtime = buf.try_get_u16()?;
        let flags = HelloFlags::from_bits_retain(buf.try_get_u16()?);

        // A targeted Hello never travels to the multicast group.
        if flags.contains(HelloFlags::TARGETED)
            && cxt.pkt_info.multicast == Some(true)
        {
            return Err(DecodeError::McastTHello(cxt.pkt_info.src_addr));
        }

        Ok(HelloParams { holdtime, flags })
    }
}

// ===== impl SessionParams =====

impl SessionParams {
    const LENGTH: usize = 14;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.version);
        buf.put_u16(self.keepalive_time);
        buf.put_u8(self.flags.bits());
        buf.put_u8(self.pvlim);
        buf.put_u16(self.max_pdu_len);
        buf.put_ipv4(&self.lsr_id);
        buf.put_u16(self.lspace_id);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> DecodeResult<SessionParams> {
        tlv::expect_len(buf, Self::LENGTH)?;

        let version = buf.try_get_u16()?;
        if version != Pdu::VERSION {
            return Err(DecodeError::InvalidVersion(version));
        }
        let keepalive_time = buf.try_get_u16()?;
        if keepalive_time == 0 {
            return Err(DecodeError::BadKeepaliveTime(keepalive_time));
        }

        Ok(SessionParams {
            version,
            keepalive_time,
            flags: SessionFlags::from_bits_retain(buf.try_get_u8()?),
            pvlim: buf.try_get_u8()?,
            max_pdu_len: buf.try_get_u16()?,
            lsr_id: buf.try_get_ipv4()?,
            lspace_id: buf.try_get_u16()?,
        })
    }
}

impl Default for SessionParams {
    fn default() -> SessionParams {
        SessionParams {
            version: Pdu::VERSION,
            keepalive_time: 0,
            flags: SessionFlags::empty(),
            pvlim: 0,
            max_pdu_len: 0,
            lsr_id: Ipv4Addr::UNSPECIFIED,
            lspace_id: 0,
        }
    }
}
