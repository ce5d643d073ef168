use std::collections::VecDeque;
use std::net::Ipv4Addr;

use super::*;

static PDU1: Lazy<(Vec<u8>, Pdu)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x01, 0x00, 0x1e, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x01, 0x04, 0x00, 0x00, 0x04,
            0x00, 0x0f, 0x00, 0x00, 0x04, 0x01, 0x00, 0x04, 0x01, 0x01, 0x01,
            0x01,
        ],
        Pdu {
            version: 1,
            lsr_id: ip4!("1.1.1.1"),
            lspace_id: 0,
            messages: VecDeque::from(vec![
                Message::new(MessageType::Hello, 1)
                    .with_tlv(HelloParams {
                        holdtime: 15,
                        flags: HelloFlags::empty(),
                    })
                    .with_tlv(Tlv::TransportAddr(ip4!("1.1.1.1"))),
            ]),
        },
    )
});

static PDU2: Lazy<(Vec<u8>, Pdu)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x01, 0x00, 0x28, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x16, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00, 0x0e,
            0x00, 0x01, 0x00, 0xb4, 0x00, 0x00, 0x10, 0x00, 0x01, 0x01, 0x01,
            0x01, 0x00, 0x00, 0x02, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02,
        ],
        Pdu {
            version: 1,
            lsr_id: ip4!("2.2.2.2"),
            lspace_id: 0,
            messages: VecDeque::from(vec![
                Message::new(MessageType::Initialization, 1).with_tlv(
                    SessionParams {
                        version: 1,
                        keepalive_time: 180,
                        flags: SessionFlags::empty(),
                        pvlim: 0,
                        max_pdu_len: 4096,
                        lsr_id: ip4!("1.1.1.1"),
                        lspace_id: 0,
                    },
                ),
                Message::keepalive(2),
            ]),
        },
    )
});

#[test]
fn test_encode_pdu1() {
    let (ref bytes, ref pdu) = *PDU1;
    test_encode_pdu(bytes, pdu);
}

#[test]
fn test_decode_pdu1() {
    let (ref bytes, ref pdu) = *PDU1;
    IPV4_CXT.with(|cxt| test_decode_pdu(cxt, bytes, pdu));
}

#[test]
fn test_encode_pdu2() {
    let (ref bytes, ref pdu) = *PDU2;
    test_encode_pdu(bytes, pdu);
}

#[test]
fn test_decode_pdu2() {
    let (ref bytes, ref pdu) = *PDU2;
    IPV4_CXT.with(|cxt| test_decode_pdu(cxt, bytes, pdu));
}

#[test]
fn test_decode_pdu_unknown_message() {
    // Message of unknown type with the U-bit set, followed by a Keepalive.
    let bytes = [
        0x00, 0x01, 0x00, 0x16, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0xbf,
        0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0x00, 0x04,
        0x00, 0x00, 0x00, 0x02,
    ];
    let pdu = IPV4_CXT.with(|cxt| Pdu::decode(&bytes, cxt)).unwrap();
    assert_eq!(pdu.messages, [Message::keepalive(2)]);

    // Same message with the U-bit clear.
    let mut bytes = bytes;
    bytes[10] = 0x3f;
    let error = IPV4_CXT.with(|cxt| Pdu::decode(&bytes, cxt)).unwrap_err();
    assert_eq!(error, DecodeError::UnknownMessage(0x3f00));
}

#[test]
fn test_decode_pdu_truncated() {
    let (ref bytes, _) = *PDU1;
    IPV4_CXT.with(|cxt| {
        for len in 0..bytes.len() {
            let error = Pdu::decode(&bytes[..len], cxt).unwrap_err();
            assert_eq!(error, DecodeError::TruncatedInput, "length {len}");
        }
    });
}

#[test]
fn test_decode_pdu_trailing_data() {
    let (ref bytes, _) = *PDU1;
    let mut bytes = bytes.clone();
    bytes.push(0);
    let error = IPV4_CXT.with(|cxt| Pdu::decode(&bytes, cxt)).unwrap_err();
    assert!(matches!(error, DecodeError::InvalidPduLength(_)));
}

#[test]
fn test_decode_pdu_invalid_version() {
    let (ref bytes, _) = *PDU1;
    let mut bytes = bytes.clone();
    bytes[1] = 0x02;
    let error = IPV4_CXT.with(|cxt| Pdu::decode(&bytes, cxt)).unwrap_err();
    assert_eq!(error, DecodeError::InvalidVersion(2));
}

#[test]
fn test_decode_pdu_length_above_max() {
    let (ref bytes, _) = *PDU1;
    let cxt = DecodeCxt {
        pkt_info: PacketInfo {
            src_addr: ip4!("1.1.1.1"),
            multicast: None,
        },
        pdu_max_len: 20,
        validate_pdu_hdr: None,
    };
    assert_eq!(
        Pdu::decode(bytes, &cxt).unwrap_err(),
        DecodeError::InvalidPduLength(30)
    );
    assert_eq!(
        Pdu::get_pdu_size(bytes, &cxt).unwrap_err(),
        DecodeError::InvalidPduLength(30)
    );
}

#[test]
fn test_decode_pdu_header_validation() {
    let (ref bytes, _) = *PDU1;
    let cxt = DecodeCxt {
        pkt_info: PacketInfo {
            src_addr: ip4!("1.1.1.1"),
            multicast: None,
        },
        pdu_max_len: Pdu::DFLT_MAX_LEN,
        validate_pdu_hdr: Some(Box::new(|lsr_id: Ipv4Addr, _lspace_id: u16| {
            if lsr_id != ip4!("2.2.2.2") {
                return Err(DecodeError::InvalidLsrId(lsr_id));
            }
            Ok(())
        })),
    };
    assert_eq!(
        Pdu::decode(bytes, &cxt).unwrap_err(),
        DecodeError::InvalidLsrId(ip4!("1.1.1.1"))
    );
}

#[test]
fn test_get_pdu_size_incomplete() {
    let (ref bytes, _) = *PDU1;
    IPV4_CXT.with(|cxt| {
        for len in [0, 3, 10, bytes.len() - 1] {
            assert_eq!(
                Pdu::get_pdu_size(&bytes[..len], cxt).unwrap_err(),
                DecodeError::IncompletePdu
            );
        }
    });
}

#[test]
fn test_decode_next_stream() {
    let (ref bytes1, ref pdu1) = *PDU1;
    let (ref bytes2, ref pdu2) = *PDU2;
    let stream = [bytes1.as_slice(), bytes2.as_slice()].concat();

    IPV4_CXT.with(|cxt| {
        let (pdu, remaining) = Pdu::decode_next(&stream, cxt).unwrap();
        assert_eq!(pdu, *pdu1);
        let (pdu, remaining) = Pdu::decode_next(remaining, cxt).unwrap();
        assert_eq!(pdu, *pdu2);
        assert!(remaining.is_empty());
    });
}

#[test]
fn test_encode_pdu_split() {
    let mut pdu = Pdu::new(ip4!("1.1.1.1"), 0);
    for msg_id in 1..=3 {
        pdu.messages.push_back(Message::keepalive(msg_id));
    }

    // Room for the header and two Keepalives.
    let max_len = Pdu::HDR_SIZE + 2 * Message::HDR_SIZE;
    let bytes = pdu.encode(max_len);
    assert_eq!(bytes.len(), 26 + 18);

    IPV4_CXT.with(|cxt| {
        let (first, remaining) = Pdu::decode_next(&bytes, cxt).unwrap();
        let (second, remaining) = Pdu::decode_next(remaining, cxt).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(first.messages.len(), 2);
        assert_eq!(second.messages.len(), 1);
        assert_eq!(second.messages[0].msg_id, 3);
    });
}

#[test]
fn test_encode_pdu_without_messages() {
    let pdu = Pdu::new(ip4!("1.1.1.1"), 0);
    assert!(pdu.encode(Pdu::DFLT_MAX_LEN).is_empty());
}

#[test]
fn test_decode_pdu_header_only() {
    // PDU length 6 covers the LDP identifier and nothing else.
    let bytes = [0x00, 0x01, 0x00, 0x06, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00];
    IPV4_CXT.with(|cxt| {
        assert_eq!(
            Pdu::decode(&bytes, cxt).unwrap_err(),
            DecodeError::InvalidPduLength(6)
        );
        assert_eq!(
            Pdu::get_pdu_size(&bytes, cxt).unwrap_err(),
            DecodeError::InvalidPduLength(6)
        );
    });
}
