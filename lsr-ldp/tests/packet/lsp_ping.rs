use lsr_ldp::packet::lsp_ping::*;
use lsr_utils::mpls::Label;

use super::*;

static ECHO_REQUEST1: Lazy<(Vec<u8>, EchoPacket)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x01, 0x00, 0x01, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x12,
            0x34, 0x00, 0x00, 0x00, 0x01, 0x67, 0x03, 0x1e, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x0c, 0x00, 0x01, 0x00, 0x08, 0x0a, 0x00, 0x00, 0x01,
            0x20, 0x00, 0x00, 0x00,
        ],
        EchoPacket {
            version: 1,
            global_flags: EchoFlags::VALIDATE_FEC_STACK,
            msg_type: EchoMsgType::EchoRequest,
            reply_mode: ReplyMode::UdpPacket,
            return_code: 0,
            return_subcode: 0,
            senders_handle: 0x1234,
            seq_num: 1,
            timestamp_sent: EchoTimestamp {
                sec: 0x67031e00,
                usec: 0x400,
            },
            timestamp_rcvd: EchoTimestamp::default(),
            tlvs: vec![EchoTlv::TargetFecStack(vec![
                FecStackSubTlv::LdpIpv4Prefix(prefix("10.0.0.1", 32)),
            ])],
        },
    )
});

static ECHO_REPLY1: Lazy<(Vec<u8>, EchoPacket)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x03, 0x01, 0x00, 0x00, 0x12,
            0x34, 0x00, 0x00, 0x00, 0x01, 0x67, 0x03, 0x1e, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x67, 0x03, 0x1e, 0x01, 0x00, 0x00, 0x08, 0x00, 0x00,
            0x01, 0x00, 0x08, 0x00, 0x10, 0x00, 0x04, 0x00, 0x00, 0x30, 0x00,
            0x00, 0x0a, 0x00, 0x04, 0xc0, 0x00, 0x00, 0x00, 0x0f, 0xff, 0x00,
            0x03, 0x01, 0x02, 0x03,
        ],
        EchoPacket {
            version: 1,
            global_flags: EchoFlags::empty(),
            msg_type: EchoMsgType::EchoReply,
            reply_mode: ReplyMode::UdpPacket,
            return_code: 3,
            return_subcode: 1,
            senders_handle: 0x1234,
            seq_num: 1,
            timestamp_sent: EchoTimestamp {
                sec: 0x67031e00,
                usec: 0x400,
            },
            timestamp_rcvd: EchoTimestamp {
                sec: 0x67031e01,
                usec: 0x800,
            },
            tlvs: vec![
                EchoTlv::TargetFecStack(vec![FecStackSubTlv::NilFec(
                    Label::from_masked(Label::IMPLICIT_NULL),
                )]),
                EchoTlv::ReplyTos(0xc0),
                EchoTlv::Unknown(TlvUnknown::new(
                    0x0fff,
                    Bytes::from_static(&[0x01, 0x02, 0x03]),
                )),
            ],
        },
    )
});

#[test]
fn test_encode_echo_request1() {
    let (ref bytes, ref packet) = *ECHO_REQUEST1;
    assert_eq_hex!(bytes, packet.encode());
}

#[test]
fn test_decode_echo_request1() {
    let (ref bytes, ref packet) = *ECHO_REQUEST1;
    assert_eq!(*packet, EchoPacket::decode(bytes).unwrap());
}

#[test]
fn test_encode_echo_reply1() {
    let (ref bytes, ref packet) = *ECHO_REPLY1;
    assert_eq_hex!(bytes, packet.encode());
}

#[test]
fn test_decode_echo_reply1() {
    let (ref bytes, ref packet) = *ECHO_REPLY1;
    assert_eq!(*packet, EchoPacket::decode(bytes).unwrap());
}

#[test]
fn test_decode_echo_truncated_header() {
    let (ref bytes, _) = *ECHO_REQUEST1;
    for len in 0..EchoPacket::HDR_SIZE {
        assert_eq!(
            EchoPacket::decode(&bytes[..len]).unwrap_err(),
            DecodeError::TruncatedInput
        );
    }
}

#[test]
fn test_decode_echo_invalid_header() {
    let (ref bytes, _) = *ECHO_REQUEST1;

    let mut invalid = bytes.clone();
    invalid[1] = 0x02;
    assert_eq!(
        EchoPacket::decode(&invalid).unwrap_err(),
        DecodeError::InvalidVersion(2)
    );

    let mut invalid = bytes.clone();
    invalid[4] = 0x03;
    assert_eq!(
        EchoPacket::decode(&invalid).unwrap_err(),
        DecodeError::InvalidEchoMsgType(3)
    );

    let mut invalid = bytes.clone();
    invalid[5] = 0x09;
    assert_eq!(
        EchoPacket::decode(&invalid).unwrap_err(),
        DecodeError::InvalidReplyMode(9)
    );
}

#[test]
fn test_decode_echo_bad_sub_tlv_length() {
    let (ref bytes, _) = *ECHO_REQUEST1;
    let mut invalid = bytes[..EchoPacket::HDR_SIZE].to_vec();
    invalid.extend_from_slice(&[
        0x00, 0x01, 0x00, 0x08, 0x00, 0x01, 0x00, 0x04, 0x0a, 0x00, 0x00,
        0x01,
    ]);
    assert_eq!(
        EchoPacket::decode(&invalid).unwrap_err(),
        DecodeError::InvalidTlvLength(4)
    );
}
