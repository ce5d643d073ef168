//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use lsr_utils::bytes::{BytesExt, BytesMutExt, TLS_BUF};
use serde::{Deserialize, Serialize};

use crate::packet::DecodeCxt;
use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::message::Message;

//
// LDP PDU header, followed by one or more messages:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Version                      |         PDU Length            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                         LDP Identifier                        |
// +                               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pdu {
    pub version: u16,
    pub lsr_id: Ipv4Addr,
    pub lspace_id: u16,
    pub messages: VecDeque<Message>,
}

// ===== impl Pdu =====

impl Pdu {
    pub const VERSION: u16 = 1;
    pub const HDR_SIZE: u16 = 10;
    pub const HDR_MIN_LEN: u16 = 6;
    pub const HDR_DEAD_LEN: u16 = 4;
    pub const DFLT_MAX_LEN: u16 = 4096;
    pub const MAX_SIZE: usize = u16::MAX as usize + Self::HDR_DEAD_LEN as usize;
    // Smallest PDU length that can carry a message.
    const MIN_LEN: u16 = Pdu::HDR_MIN_LEN + Message::HDR_SIZE;

    pub fn new(lsr_id: Ipv4Addr, lspace_id: u16) -> Pdu {
        Pdu {
            version: Pdu::VERSION,
            lsr_id,
            lspace_id,
            messages: VecDeque::new(),
        }
    }

    // Encodes the messages into as many PDUs as `max_pdu_len` requires,
    // back to back. No messages means no PDU at all.
    //
    // A message that alone exceeds the limit still goes out in its own PDU.
    pub fn encode(&self, max_pdu_len: u16) -> BytesMut {
        let mut out = BytesMut::new();

        TLS_BUF.with(|buf| {
            let mut buf = buf.borrow_mut();
            buf.clear();

            for msg in &self.messages {
                if buf.is_empty() {
                    self.encode_hdr(&mut buf);
                }

                let msg_start = buf.len();
                msg.encode(&mut buf);

                if buf.len() > max_pdu_len as usize
                    && msg_start > Pdu::HDR_SIZE as usize
                {
                    let msg_bytes = buf.split_off(msg_start);
                    Pdu::flush(&mut buf, &mut out);
                    self.encode_hdr(&mut buf);
                    buf.extend_from_slice(&msg_bytes);
                }
            }

            if !buf.is_empty() {
                Pdu::flush(&mut buf, &mut out);
            }
        });

        out
    }

    fn encode_hdr(&self, buf: &mut BytesMut) {
        buf.put_u16(self.version);
        // Length placeholder.
        buf.put_u16(0);
        buf.put_ipv4(&self.lsr_id);
        buf.put_u16(self.lspace_id);
    }

    // Fixes up the length of the PDU in `buf` and moves it to `out`.
    fn flush(buf: &mut BytesMut, out: &mut BytesMut) {
        let pdu_len = buf.len() as u16 - Pdu::HDR_DEAD_LEN;
        buf.rewrite_u16(2, pdu_len);
        out.extend_from_slice(buf);
        buf.clear();
    }

    // Decodes the first PDU of `data`, returning it along with the bytes that
    // follow it.
    pub fn decode_next<'a>(
        data: &'a [u8],
        cxt: &DecodeCxt,
    ) -> DecodeResult<(Self, &'a [u8])> {
        let mut buf = Bytes::copy_from_slice(data);
        let (mut pdu, pdu_len) = Pdu::decode_hdr(&mut buf, cxt)?;

        // Nothing past the declared length is looked at.
        let body_len = pdu_len - Pdu::HDR_MIN_LEN;
        let mut body = buf.try_split_to(body_len as usize)?;
        while body.has_remaining() {
            if let Some(msg) = Message::decode(&mut body, cxt)? {
                pdu.messages.push_back(msg);
            }
        }

        let pdu_size = pdu_len as usize + Pdu::HDR_DEAD_LEN as usize;
        Ok((pdu, &data[pdu_size..]))
    }

    // Decodes a buffer holding exactly one PDU.
    pub fn decode(data: &[u8], cxt: &DecodeCxt) -> DecodeResult<Self> {
        let (pdu, remaining) = Pdu::decode_next(data, cxt)?;
        if !remaining.is_empty() {
            return Err(DecodeError::InvalidPduLength(
                (data.len() - Pdu::HDR_DEAD_LEN as usize) as u16,
            ));
        }

        Ok(pdu)
    }

    fn decode_hdr(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
    ) -> DecodeResult<(Pdu, u16)> {
        let version = buf.try_get_u16()?;
        if version != Pdu::VERSION {
            return Err(DecodeError::InvalidVersion(version));
        }

        let pdu_len = buf.try_get_u16()?;
        if pdu_len < Pdu::MIN_LEN || pdu_len > cxt.pdu_max_len {
            return Err(DecodeError::InvalidPduLength(pdu_len));
        }
        if buf.remaining() < pdu_len as usize {
            return Err(DecodeError::TruncatedInput);
        }

        let lsr_id = buf.try_get_ipv4()?;
        let lspace_id = buf.try_get_u16()?;
        if let Some(validate_pdu_hdr) = &cxt.validate_pdu_hdr {
            (validate_pdu_hdr)(lsr_id, lspace_id)?;
        }

        Ok((Pdu::new(lsr_id, lspace_id), pdu_len))
    }

    // Returns the size of the PDU at the head of `data` once all of it has
    // arrived.
    pub fn get_pdu_size(data: &[u8], cxt: &DecodeCxt) -> DecodeResult<usize> {
        let [_, _, len_hi, len_lo, ..] = *data else {
            return Err(DecodeError::IncompletePdu);
        };

        let pdu_len = u16::from_be_bytes([len_hi, len_lo]);
        if pdu_len < Pdu::MIN_LEN || pdu_len > cxt.pdu_max_len {
            return Err(DecodeError::InvalidPduLength(pdu_len));
        }

        let pdu_size = pdu_len as usize + Pdu::HDR_DEAD_LEN as usize;
        if data.len() < pdu_size {
            return Err(DecodeError::IncompletePdu);
        }

        Ok(pdu_size)
    }
}
