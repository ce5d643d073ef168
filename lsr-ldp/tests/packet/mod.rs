//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod address;
mod hello;
mod initialization;
mod keepalive;
mod label;
mod lsp_ping;
mod notification;
mod pdu;

use std::sync::LazyLock as Lazy;

use bytes::{Bytes, BytesMut};
use const_addrs::ip4;
use ipnetwork::Ipv4Network;
use lsr_ldp::packet::*;

macro_rules! assert_eq_hex {
    ($left:expr, $right:expr) => {
        if $left[..] != $right[..] {
            panic!(
                "assertion `left == right` failed\n  left: [{}]\n right: [{}]",
                $left
                    .iter()
                    .map(|b| format!("0x{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(", "),
                $right
                    .iter()
                    .map(|b| format!("0x{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    };
}
pub(crate) use assert_eq_hex;

thread_local! {
    static IPV4_CXT: DecodeCxt = DecodeCxt {
        pkt_info: PacketInfo {
            src_addr: ip4!("1.1.1.1"),
            multicast: None,
        },
        pdu_max_len: Pdu::DFLT_MAX_LEN,
        validate_pdu_hdr: None,
    };
}

//
// Helper functions.
//

fn prefix(addr: &str, plen: u8) -> Ipv4Network {
    Ipv4Network::new(addr.parse().unwrap(), plen).unwrap()
}

fn test_encode_msg(bytes_expected: &[u8], msg: &Message) {
    let mut bytes_actual = BytesMut::with_capacity(1500);
    msg.encode(&mut bytes_actual);
    assert_eq_hex!(bytes_expected, bytes_actual);
}

fn test_decode_msg(cxt: &DecodeCxt, bytes: &[u8], msg_expected: &Message) {
    let mut buf = Bytes::copy_from_slice(bytes);
    let msg_actual = Message::decode(&mut buf, cxt).unwrap().unwrap();
    assert!(buf.is_empty());
    assert_eq!(*msg_expected, msg_actual);
}

fn test_decode_msg_error(
    cxt: &DecodeCxt,
    bytes: &[u8],
    error_expected: DecodeError,
) {
    let mut buf = Bytes::copy_from_slice(bytes);
    let error_actual = Message::decode(&mut buf, cxt).unwrap_err();
    assert_eq!(error_expected, error_actual);
}

// Decodes a message and checks that encoding it again gives back the same
// bytes.
fn test_reencode_msg(cxt: &DecodeCxt, bytes: &[u8]) -> Message {
    let mut buf = Bytes::copy_from_slice(bytes);
    let msg = Message::decode(&mut buf, cxt).unwrap().unwrap();
    test_encode_msg(bytes, &msg);
    msg
}

fn test_encode_pdu(bytes_expected: &[u8], pdu: &Pdu) {
    let bytes_actual = pdu.encode(Pdu::DFLT_MAX_LEN);
    assert_eq_hex!(bytes_expected, bytes_actual);
}

fn test_decode_pdu(cxt: &DecodeCxt, bytes: &[u8], pdu_expected: &Pdu) {
    let pdu_size = Pdu::get_pdu_size(bytes, cxt).unwrap();
    assert_eq!(pdu_size, bytes.len());
    let pdu_actual = Pdu::decode(bytes, cxt).unwrap();
    assert_eq!(*pdu_expected, pdu_actual);
}
