// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use coap_transport::codec::{self, option_registry::number, Code, Message, Token, Type};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[test]
fn get_request_with_a_single_uri_path_segment() {
    let mut m = Message::new(Type::Confirmable, Code::GET, 0x1234, Token(0xAB));
    m.add_option(number::URI_PATH, b"a".to_vec());
    assert_eq!(hex(&codec::encode(&m).unwrap()), "44011234ABB161");
}

#[test]
fn empty_token_get_request() {
    let m = Message::new(Type::Confirmable, Code::GET, 0x0001, Token(0));
    assert_eq!(hex(&codec::encode(&m).unwrap()), "40010001");
}

#[test]
fn empty_ack_mirrors_message_id() {
    let m = Message::empty_ack(0x7F7F);
    assert_eq!(hex(&codec::encode(&m).unwrap()), "60007F7F");
}

#[test]
fn reset_synthesized_for_an_unknown_confirmable_get() {
    // inbound: CON GET, mid 0x0005, token 0xAABB
    let inbound = codec::decode(&[0x42, 0x01, 0x00, 0x05, 0xAA, 0xBB]).unwrap();
    assert_eq!(inbound.mtype, Type::Confirmable);
    assert_eq!(inbound.token, Token(0xAABB));

    let rst = Message::empty_reset(inbound.message_id);
    assert_eq!(hex(&codec::encode(&rst).unwrap()), "70000005");
}

#[test]
fn code_display_matches_class_dot_detail() {
    assert_eq!(Code::GET.to_string(), "0.01");
    assert_eq!(Code::CONTENT.to_string(), "2.05");
    assert_eq!(Code::EMPTY.to_string(), "0.00");
}

#[test]
fn put_and_post_are_distinct_codes() {
    assert_ne!(Code::PUT, Code::POST);
    assert_eq!(Code::PUT, Code::new(0, 3));
    assert_eq!(Code::POST, Code::new(0, 2));
}

#[test]
fn a_zero_length_payload_marker_decodes_as_no_payload() {
    let decoded = codec::decode(&[0x40, 0x01, 0x00, 0x01, 0xFF]).unwrap();
    assert!(decoded.payload.is_none());
}

#[test]
fn datagram_shorter_than_the_header_is_rejected() {
    assert!(codec::decode(&[0x40, 0x01, 0x00]).is_err());
}
