use super::*;

static HELLO_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x01, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x01, 0x04, 0x00, 0x00,
            0x04, 0x00, 0x0f, 0x00, 0x00, 0x04, 0x01, 0x00, 0x04, 0x01, 0x01,
            0x01, 0x01,
        ],
        Message::new(MessageType::Hello, 1)
            .with_tlv(HelloParams {
                holdtime: 15,
                flags: HelloFlags::empty(),
            })
            .with_tlv(Tlv::TransportAddr(ip4!("1.1.1.1"))),
    )
});

static HELLO_MSG2: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x01, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x00, 0x02, 0x04, 0x00, 0x00,
            0x04, 0x00, 0x2d, 0x00, 0x00, 0x04, 0x01, 0x00, 0x04, 0x0a, 0x00,
            0x01, 0x01, 0x04, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02,
        ],
        Message::new(MessageType::Hello, 2)
            .with_tlv(HelloParams {
                holdtime: 45,
                flags: HelloFlags::empty(),
            })
            .with_tlv(Tlv::TransportAddr(ip4!("10.0.1.1")))
            .with_tlv(Tlv::ConfigSeqNo(2)),
    )
});

#[test]
fn test_encode_hello1() {
    let (ref bytes, ref msg) = *HELLO_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_hello1() {
    let (ref bytes, ref msg) = *HELLO_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_hello2() {
    let (ref bytes, ref msg) = *HELLO_MSG2;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_hello2() {
    let (ref bytes, ref msg) = *HELLO_MSG2;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_decode_hello_unknown_tlv_in_middle() {
    // Common Hello Parameters, an unassigned TLV (U and F set), then the
    // transport address.
    let bytes = [
        0x01, 0x00, 0x00, 0x1a, 0x00, 0x00, 0x00, 0x05, 0x04, 0x00, 0x00,
        0x04, 0x00, 0x0f, 0x00, 0x00, 0xbe, 0x00, 0x00, 0x02, 0xca, 0xfe,
        0x04, 0x01, 0x00, 0x04, 0x01, 0x01, 0x01, 0x01,
    ];
    let msg = IPV4_CXT.with(|cxt| test_reencode_msg(cxt, &bytes));

    let unknown =
        TlvUnknown::new(0xbe00, Bytes::from_static(&[0xca, 0xfe]));
    assert_eq!(
        msg.tlvs,
        vec![
            Tlv::HelloParams(HelloParams {
                holdtime: 15,
                flags: HelloFlags::empty(),
            }),
            Tlv::Unknown(unknown.clone()),
            Tlv::TransportAddr(ip4!("1.1.1.1")),
        ]
    );
    assert_eq!(msg.unknown_tlvs().collect::<Vec<_>>(), vec![&unknown]);
    assert_eq!(msg.transport_addr(), Some(ip4!("1.1.1.1")));
}

#[test]
fn test_decode_hello_reserved_flags() {
    // Reserved bits 0x2000 and 0x0001 set next to the T flag.
    let bytes = [
        0x01, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x06, 0x04, 0x00, 0x00,
        0x04, 0x00, 0x0f, 0xa0, 0x01,
    ];
    let msg = IPV4_CXT.with(|cxt| test_reencode_msg(cxt, &bytes));

    let params = msg.hello_params().unwrap();
    assert_eq!(params.flags.bits(), 0xa001);
    assert!(params.flags.contains(HelloFlags::TARGETED));
    assert!(!params.flags.contains(HelloFlags::REQ_TARGETED));
}

#[test]
fn test_decode_hello_targeted_multicast() {
    let bytes = [
        0x01, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x07, 0x04, 0x00, 0x00,
        0x04, 0x00, 0x0f, 0x80, 0x00,
    ];
    let cxt = DecodeCxt {
        pkt_info: PacketInfo {
            src_addr: ip4!("10.0.1.2"),
            multicast: Some(true),
        },
        pdu_max_len: Pdu::DFLT_MAX_LEN,
        validate_pdu_hdr: None,
    };
    test_decode_msg_error(
        &cxt,
        &bytes,
        DecodeError::McastTHello(ip4!("10.0.1.2")),
    );
}

#[test]
fn test_decode_hello_missing_params() {
    // Transport address TLV without the mandatory Common Hello Parameters.
    let bytes = [
        0x01, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x01, 0x04, 0x01, 0x00,
        0x04, 0x01, 0x01, 0x01, 0x01,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::MissingMsgParams(
                MessageType::Hello,
                TlvType::CommonHelloParams,
            ),
        )
    });
}

#[test]
fn test_decode_hello_invalid_trans_addr() {
    let bytes = [
        0x01, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x01, 0x04, 0x00, 0x00,
        0x04, 0x00, 0x0f, 0x00, 0x00, 0x04, 0x01, 0x00, 0x04, 0x7f, 0x00,
        0x00, 0x01,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::InvalidTransportAddr(ip4!("127.0.0.1")),
        )
    });
}

#[test]
fn test_hello_transport_addr() {
    let (_, ref msg) = *HELLO_MSG1;
    assert_eq!(msg.transport_addr(), Some(ip4!("1.1.1.1")));

    let msg = Message::new(MessageType::Hello, 1)
        .with_tlv(HelloParams::default());
    assert_eq!(msg.transport_addr(), None);
}
