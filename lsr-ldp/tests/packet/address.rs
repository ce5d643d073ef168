use super::*;

static ADDRESS_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x03, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00,
            0x0a, 0x00, 0x01, 0x0a, 0x00, 0x01, 0x01, 0x0a, 0x00, 0x02, 0x01,
        ],
        Message::new(MessageType::Address, 1).with_tlv(Tlv::AddrList(vec![
            ip4!("10.0.1.1"),
            ip4!("10.0.2.1"),
        ])),
    )
});

static ADDRESS_WITHDRAW_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x03, 0x01, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x02, 0x01, 0x01, 0x00,
            0x06, 0x00, 0x01, 0x0a, 0x00, 0x01, 0x01,
        ],
        Message::new(MessageType::AddressWithdraw, 2)
            .with_tlv(Tlv::AddrList(vec![ip4!("10.0.1.1")])),
    )
});

#[test]
fn test_encode_address1() {
    let (ref bytes, ref msg) = *ADDRESS_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_address1() {
    let (ref bytes, ref msg) = *ADDRESS_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_address_withdraw1() {
    let (ref bytes, ref msg) = *ADDRESS_WITHDRAW_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_address_withdraw1() {
    let (ref bytes, ref msg) = *ADDRESS_WITHDRAW_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_decode_address_unsupported_af() {
    // IPv6 address family.
    let bytes = [
        0x03, 0x00, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00,
        0x06, 0x00, 0x02, 0x0a, 0x00, 0x01, 0x01,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::UnsupportedAf(2))
    });
}

#[test]
fn test_decode_address_partial_addr() {
    let bytes = [
        0x03, 0x00, 0x00, 0x0d, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00,
        0x05, 0x00, 0x01, 0x0a, 0x00, 0x01,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::InvalidTlvLength(5))
    });
}

#[test]
fn test_decode_address_wire_order() {
    // Addresses stay in the order the peer listed them.
    let bytes = [
        0x03, 0x00, 0x00, 0x12, 0x00, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00,
        0x0a, 0x00, 0x01, 0x0a, 0x00, 0x02, 0x01, 0x0a, 0x00, 0x01, 0x01,
    ];
    let msg = IPV4_CXT.with(|cxt| test_reencode_msg(cxt, &bytes));
    assert_eq!(msg.addr_list(), [ip4!("10.0.2.1"), ip4!("10.0.1.1")]);
}
