//! Codec Tests
//!
//! Tests for binary command and response encoding/decoding.

use std::io::Cursor;

use linekv::protocol::{
    codec::{read_frame, read_response, write_command, write_response},
    decode_command, decode_response, encode_command, encode_response, Command, ParseError,
    Response, Status,
};
use linekv::KvError;

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_round_trip_edge_lengths() {
    let commands = [
        Command::Set {
            key: String::new(),
            value: String::new(),
        },
        Command::Set {
            key: "k".into(),
            value: "v".into(),
        },
        Command::Set {
            key: "ключ".into(),
            value: "значение с пробелами".into(),
        },
        Command::Get { key: String::new() },
        Command::Del { key: "鍵".into() },
    ];

    for command in commands {
        let encoded = encode_command(&command);
        assert_eq!(decode_command(&encoded).unwrap(), command);
    }
}

#[test]
fn test_get_wire_bytes() {
    let encoded = encode_command(&Command::Get { key: "abc".into() });
    assert_eq!(encoded, b"GET\x00\x00\x00\x03abc");
}

#[test]
fn test_set_wire_bytes() {
    let encoded = encode_command(&Command::Set {
        key: "k".into(),
        value: "vv".into(),
    });
    assert_eq!(encoded, b"SET\x00\x00\x00\x01k\x00\x00\x00\x02vv");
}

#[test]
fn test_decode_rejects_lowercase_tag() {
    let result = decode_command(b"get\x00\x00\x00\x01k");
    assert!(matches!(result, Err(ParseError::UnknownTag(_))));
}

#[test]
fn test_decode_rejects_truncated_key() {
    let result = decode_command(b"GET\x00\x00\x00\x05ab");
    assert!(matches!(result, Err(ParseError::Truncated { .. })));
}

#[test]
fn test_decode_rejects_missing_value_length() {
    let result = decode_command(b"SET\x00\x00\x00\x01k");
    assert!(matches!(result, Err(ParseError::Truncated { .. })));
}

#[test]
fn test_decode_rejects_trailing_bytes() {
    let mut bytes = encode_command(&Command::Del { key: "k".into() });
    bytes.extend_from_slice(b"xx");

    assert_eq!(decode_command(&bytes), Err(ParseError::TrailingBytes(2)));
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    let result = decode_command(b"GET\x00\x00\x00\x02\xff\xfe");
    assert!(matches!(result, Err(ParseError::InvalidUtf8(_))));
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_response_envelope_layout() {
    let encoded = encode_response(&Response::not_found("gone"));
    assert_eq!(encoded, b"\x01\x01\x00\x00\x00\x04gone");
}

#[test]
fn test_response_round_trip() {
    for response in [
        Response::ok("VALUE: hello"),
        Response::not_found("no record with key 'k'"),
        Response::error(""),
    ] {
        let encoded = encode_response(&response);
        assert_eq!(decode_response(&encoded).unwrap(), response);
    }
}

#[test]
fn test_decode_response_rejects_unknown_version() {
    let result = decode_response(b"\x07\x00\x00\x00\x00\x00");
    assert!(matches!(result, Err(KvError::Protocol(_))));
}

#[test]
fn test_decode_response_rejects_unknown_status() {
    let result = decode_response(b"\x01\x09\x00\x00\x00\x00");
    assert!(matches!(result, Err(KvError::Protocol(_))));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_read_frame_splits_back_to_back_commands() {
    let mut stream = Vec::new();
    write_command(&mut stream, &Command::Set { key: "a".into(), value: "1".into() }).unwrap();
    write_command(&mut stream, &Command::Get { key: "a".into() }).unwrap();

    let mut cursor = Cursor::new(stream);
    let first = read_frame(&mut cursor, 1024).unwrap().unwrap();
    let second = read_frame(&mut cursor, 1024).unwrap().unwrap();

    assert_eq!(
        decode_command(&first).unwrap(),
        Command::Set { key: "a".into(), value: "1".into() }
    );
    assert_eq!(decode_command(&second).unwrap(), Command::Get { key: "a".into() });
    assert!(read_frame(&mut cursor, 1024).unwrap().is_none());
}

#[test]
fn test_read_frame_rejects_oversized_length() {
    let mut cursor = Cursor::new(b"GET\x00\x00\x10\x00".to_vec());
    let result = read_frame(&mut cursor, 16);
    assert!(matches!(result, Err(KvError::FrameTooLarge { len: 4103, max: 16 })));
}

#[test]
fn test_read_frame_huge_length_prefix_with_no_payload() {
    // A ~4 GiB claim under an unlimited frame size must fail on the missing
    // bytes, not by reserving the claimed length first
    let mut cursor = Cursor::new(b"SET\xff\xff\xff\xf0abc".to_vec());
    match read_frame(&mut cursor, usize::MAX) {
        Err(KvError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected UnexpectedEof, got {:?}", other),
    }
}

#[test]
fn test_read_frame_set_total_size_is_limited() {
    let bytes = encode_command(&Command::Set {
        key: "key".into(),
        value: "value".into(),
    });
    assert_eq!(bytes.len(), 19);

    assert!(read_frame(&mut Cursor::new(bytes.clone()), 19).unwrap().is_some());
    assert!(matches!(
        read_frame(&mut Cursor::new(bytes), 18),
        Err(KvError::FrameTooLarge { len: 19, max: 18 })
    ));
}

#[test]
fn test_read_frame_rejects_unknown_tag() {
    let mut cursor = Cursor::new(b"PUT\x00\x00\x00\x01k".to_vec());
    assert!(matches!(
        read_frame(&mut cursor, 1024),
        Err(KvError::Parse(ParseError::UnknownTag(_)))
    ));
}

#[test]
fn test_read_frame_truncated_mid_frame_is_error() {
    let mut cursor = Cursor::new(b"GET\x00\x00\x00\x05ab".to_vec());
    assert!(read_frame(&mut cursor, 1024).is_err());
}

#[test]
fn test_response_stream_round_trip() {
    let mut stream = Vec::new();
    write_response(&mut stream, &Response::ok("SET OK: k = v")).unwrap();

    let response = read_response(&mut Cursor::new(stream)).unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.message, "SET OK: k = v");
}
