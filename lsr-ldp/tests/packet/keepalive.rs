use super::*;

static KEEPALIVE_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![0x02, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x09],
        Message::keepalive(9),
    )
});

// Keepalive carrying a TLV of an unassigned type with the U and F bits set.
static KEEPALIVE_MSG2: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x02, 0x01, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x0a, 0xbf, 0x00, 0x00,
            0x02, 0xde, 0xad,
        ],
        Message::keepalive(10).with_tlv(TlvUnknown::new(
            0xbf00,
            Bytes::from_static(&[0xde, 0xad]),
        )),
    )
});

#[test]
fn test_encode_keepalive1() {
    let (ref bytes, ref msg) = *KEEPALIVE_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_keepalive1() {
    let (ref bytes, ref msg) = *KEEPALIVE_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_keepalive2() {
    let (ref bytes, ref msg) = *KEEPALIVE_MSG2;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_keepalive2() {
    let (ref bytes, ref msg) = *KEEPALIVE_MSG2;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_decode_keepalive_bad_tlv_length() {
    // The unknown TLV claims more bytes than the message holds.
    let bytes = [
        0x02, 0x01, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x0a, 0xbf, 0x00, 0x00,
        0x08, 0xde, 0xad,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::TruncatedInput)
    });
}
