use super::*;

static NOTIF_MSG1: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x01, 0x00, 0x12, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x00,
            0x0a, 0x80, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        Message::notification(3, StatusCode::Shutdown, None),
    )
});

static NOTIF_MSG2: Lazy<(Vec<u8>, Message)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x01, 0x00, 0x12, 0x00, 0x00, 0x00, 0x04, 0x03, 0x00, 0x00,
            0x0a, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x07, 0x02, 0x01,
        ],
        Message::notification(
            4,
            StatusCode::UnknownTlv,
            Some((7, MessageType::Keepalive)),
        ),
    )
});

#[test]
fn test_encode_notif1() {
    let (ref bytes, ref msg) = *NOTIF_MSG1;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_notif1() {
    let (ref bytes, ref msg) = *NOTIF_MSG1;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_encode_notif2() {
    let (ref bytes, ref msg) = *NOTIF_MSG2;
    test_encode_msg(bytes, msg);
}

#[test]
fn test_decode_notif2() {
    let (ref bytes, ref msg) = *NOTIF_MSG2;
    IPV4_CXT.with(|cxt| test_decode_msg(cxt, bytes, msg));
}

#[test]
fn test_notif_status() {
    let (_, ref msg) = *NOTIF_MSG1;
    assert_eq!(msg.status_code(), Some(StatusCode::Shutdown));
    assert!(msg.is_fatal_error());

    let (_, ref msg) = *NOTIF_MSG2;
    assert_eq!(msg.status_code(), Some(StatusCode::UnknownTlv));
    assert!(!msg.is_fatal_error());
}

#[test]
fn test_status_code_from_decode_error() {
    assert_eq!(
        DecodeError::InvalidVersion(2).status_code(),
        StatusCode::BadProtoVers
    );
    assert_eq!(
        DecodeError::UnknownFec(0x80).status_code(),
        StatusCode::UnknownFec
    );
    assert_eq!(
        DecodeError::BadKeepaliveTime(0).status_code(),
        StatusCode::SessRejKeepalive
    );
    assert_eq!(
        DecodeError::MalformedFec.status_code(),
        StatusCode::MalformedTlvValue
    );
}
