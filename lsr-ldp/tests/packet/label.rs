use lsr_utils::mpls::Label;

use super::*;

fn label(value: u32) -> Tlv {
    Tlv::Label(Label::new(value).unwrap())
}

static LABEL_MAPPING_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x04, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
            0x08, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x02, 0x00,
            0x00, 0x04, 0x00, 0x00, 0x00, 0x64,
        ],
        Message::new(MessageType::LabelMapping, 1)
            .with_tlv(TlvFec::from(prefix("10.0.0.0", 8)))
            .with_tlv(label(100)),
    )
});

static LABEL_MAPPING_MSG2: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x04, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x02, 0x01, 0x00, 0x00,
            0x10, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00,
            0x01, 0x18, 0xc0, 0xa8, 0x01, 0x00, 0x02, 0x00, 0x00, 0x04, 0x00,
            0x00, 0x00, 0x03,
        ],
        Message::new(MessageType::LabelMapping, 2)
            .with_tlv(TlvFec(vec![
                FecElem::Prefix(prefix("0.0.0.0", 0)),
                FecElem::Prefix(prefix("192.168.1.0", 24)),
            ]))
            .with_tlv(label(Label::IMPLICIT_NULL)),
    )
});

static LABEL_REQUEST_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x04, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00,
            0x08, 0x02, 0x00, 0x01, 0x20, 0x01, 0x01, 0x01, 0x01,
        ],
        Message::new(MessageType::LabelRequest, 3)
            .with_tlv(TlvFec::from(prefix("1.1.1.1", 32))),
    )
});

static LABEL_WITHDRAW_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x04, 0x02, 0x00, 0x09, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00,
            0x01, 0x01,
        ],
        Message::new(MessageType::LabelWithdraw, 4)
            .with_tlv(TlvFec(vec![FecElem::Wildcard])),
    )
});

static LABEL_ABORT_REQ_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x04, 0x04, 0x00, 0x18, 0x00, 0x00, 0x00, 0x05, 0x01, 0x00, 0x00,
            0x08, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x06, 0x00,
            0x00, 0x04, 0x00, 0x00, 0x00, 0x03,
        ],
        Message::new(MessageType::LabelAbortReq, 5)
            .with_tlv(TlvFec::from(prefix("10.0.0.0", 8)))
            .with_tlv(Tlv::LabelRequestId(3)),
    )
});

#[test]
fn test_encode_label_mapping1() {
    let (ref bytes, ref msg) = *LABEL_MAPPING_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_label_mapping1() {
    let (ref bytes, ref msg) = *LABEL_MAPPING_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_label_mapping2() {
    let (ref bytes, ref msg) = *LABEL_MAPPING_MSG2;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_label_mapping2() {
    let (ref bytes, ref msg) = *LABEL_MAPPING_MSG2;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_label_request1() {
    let (ref bytes, ref msg) = *LABEL_REQUEST_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_label_request1() {
    let (ref bytes, ref msg) = *LABEL_REQUEST_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_label_withdraw1() {
    let (ref bytes, ref msg) = *LABEL_WITHDRAW_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_label_withdraw1() {
    let (ref bytes, ref msg) = *LABEL_WITHDRAW_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_label_abort_req1() {
    let (ref bytes, ref msg) = *LABEL_ABORT_REQ_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_label_abort_req1() {
    let (ref bytes, ref msg) = *LABEL_ABORT_REQ_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_label_host_bits() {
    // Host bits never make it to the wire.
    let msg = Message::new(MessageType::LabelRequest, 3).with_tlv(
        TlvFec::from(Ipv4Network::new(ip4!("1.1.1.1"), 8).unwrap()),
    );
    let bytes = [
        0x04, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00,
        0x08, 0x02, 0x00, 0x01, 0x08, 0x01, 0x00, 0x00, 0x00,
    ];
    test_encode_msg(&bytes, &msg);
}

#[test]
fn test_decode_label_mapping_host_bits() {
    // Prefix bits beyond the prefix length are cleared.
    let bytes = [
        0x04, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x08, 0x02, 0x00, 0x01, 0x04, 0x1f, 0x00, 0x00, 0x00, 0x02, 0x00,
        0x00, 0x04, 0x00, 0x00, 0x00, 0x64,
    ];
    let mut buf = Bytes::copy_from_slice(&bytes);
    let msg = IPV4_CXT
        .with(|cxt| Message::decode(&mut buf, cxt))
        .unwrap()
        .unwrap();
    let prefixes = msg.fec().unwrap().prefixes().collect::<Vec<_>>();
    assert_eq!(prefixes, [prefix("16.0.0.0", 4)]);
    assert_eq!(msg.label(), Label::new(100));
}

#[test]
fn test_decode_label_short_prefix() {
    // Only two of the four prefix octets.
    let bytes = [
        0x04, 0x01, 0x00, 0x0e, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x06, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::TruncatedInput)
    });
}

#[test]
fn test_decode_label_empty_fec() {
    let bytes = [
        0x04, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x00, 0x02, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x64,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::MalformedFec)
    });
}

#[test]
fn test_decode_label_mapping_missing_label() {
    let bytes = [
        0x04, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x08, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::MissingMsgParams(
                MessageType::LabelMapping,
                TlvType::GenericLabel,
            ),
        )
    });
}

#[test]
fn test_decode_label_mapping_wildcard() {
    let bytes = [
        0x04, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x01, 0x02, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x64,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::UnknownFec(TLV_FEC_ELEMENT_WILDCARD),
        )
    });
}

#[test]
fn test_decode_label_request_two_fecs() {
    let bytes = [
        0x04, 0x01, 0x00, 0x18, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x10, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x02, 0x00,
        0x01, 0x20, 0x01, 0x01, 0x01, 0x01,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::InvalidTlvValue(TlvType::Fec),
        )
    });
}

#[test]
fn test_decode_label_unknown_fec() {
    let bytes = [
        0x04, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x80, 0x02, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x64,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::UnknownFec(0x80))
    });
}

#[test]
fn test_decode_label_invalid_prefix_length() {
    let bytes = [
        0x04, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x08, 0x02, 0x00, 0x01, 0x21, 0x0a, 0x00, 0x00, 0x00, 0x02, 0x00,
        0x00, 0x04, 0x00, 0x00, 0x00, 0x64,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(cxt, &bytes, DecodeError::InvalidPrefixLength(33))
    });
}

#[test]
fn test_decode_label_reserved_label() {
    // Router Alert can't be advertised.
    let bytes = [
        0x04, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x08, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x02, 0x00,
        0x00, 0x04, 0x00, 0x00, 0x00, 0x01,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::InvalidTlvValue(TlvType::GenericLabel),
        )
    });
}

#[test]
fn test_decode_label_ipv6_null_for_ipv4() {
    let bytes = [
        0x04, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x08, 0x02, 0x00, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x02, 0x00,
        0x00, 0x04, 0x00, 0x00, 0x00, 0x02,
    ];
    IPV4_CXT.with(|cxt| {
        test_decode_msg_error(
            cxt,
            &bytes,
            DecodeError::InvalidTlvValue(TlvType::GenericLabel),
        )
    });
}
