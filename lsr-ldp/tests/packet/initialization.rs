use super::*;

static INIT_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x02, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00,
            0x0e, 0x00, 0x01, 0x00, 0xb4, 0x00, 0x00, 0x10, 0x00, 0x02, 0x02,
            0x02, 0x02, 0x00, 0x00,
        ],
        Message::new(MessageType::Initialization, 1).with_tlv(SessionParams {
            version: 1,
            keepalive_time: 180,
            flags: SessionFlags::empty(),
            pvlim: 0,
            max_pdu_len: 4096,
            lsr_id: ip4!("2.2.2.2"),
            lspace_id: 0,
        }),
    )
});

#[test]
fn test_encode_init1() {
    let (ref bytes, ref msg) = *INIT_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_init1() {
    let (ref bytes, ref msg) = *INIT_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_decode_init_zero_keepalive() {
    let bytes = [
        0x02, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00,
        0x0e, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x02, 0x02,
        0x02, 0x02, 0x00, 0x00,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::BadKeepaliveTime(0))
    });
}

#[test]
fn test_decode_init_bad_tlv_length() {
    // Common Session Parameters TLV one byte short.
    let bytes = [
        0x02, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00,
        0x0d, 0x00, 0x01, 0x00, 0xb4, 0x00, 0x00, 0x10, 0x00, 0x02, 0x02,
        0x02, 0x02, 0x00,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::InvalidTlvLength(13))
    });
}

#[test]
fn test_decode_init_reserved_flags() {
    // Loop detection plus a reserved bit.
    let bytes = [
        0x02, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00,
        0x0e, 0x00, 0x01, 0x00, 0xb4, 0x41, 0x00, 0x10, 0x00, 0x02, 0x02,
        0x02, 0x02, 0x00, 0x00,
    ];
    let msg = IPV4_CXT.with(|cxt| test_reencode_msg(cxt, &bytes));

    let params = msg.session_params().unwrap();
    assert_eq!(params.flags.bits(), 0x41);
    assert!(params.flags.contains(SessionFlags::LOOP_DETECTION));
}
