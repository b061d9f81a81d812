//! Tests for the frame codec: error handling and edge cases.

use simbridge_protocol::{read_frame, write_frame, Frame, MessageTag, ProtocolError};
use std::io::Cursor;

/// Helper: write a raw length-prefixed payload into a buffer.
fn make_length_prefixed(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

#[test]
fn test_roundtrip_output_frame() {
    let frame = Frame::new(&MessageTag::OutputMessage, "hello\n").unwrap();
    let mut buf = Vec::new();
    write_frame(&mut buf, &frame).unwrap();

    let decoded = read_frame(&mut Cursor::new(buf)).unwrap();
    assert_eq!(decoded.tag, "c_output_message");
    assert_eq!(decoded.text(), "hello\n");
}

#[test]
fn test_wire_layout_is_length_then_json() {
    let frame = Frame::empty(&MessageTag::ScriptEnd);
    let mut buf = Vec::new();
    write_frame(&mut buf, &frame).unwrap();

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    assert_eq!(len, buf.len() - 4);
    let body: serde_json::Value = serde_json::from_slice(&buf[4..]).unwrap();
    assert_eq!(body["type"], "c_script_end");
}

#[test]
fn test_frames_read_back_in_order() {
    let mut buf = Vec::new();
    for i in 0..3 {
        let frame = Frame::new(&MessageTag::OutputMessage, &format!("line {i}")).unwrap();
        write_frame(&mut buf, &frame).unwrap();
    }

    let mut reader = Cursor::new(buf);
    for i in 0..3 {
        assert_eq!(read_frame(&mut reader).unwrap().text(), format!("line {i}"));
    }
    assert!(matches!(
        read_frame(&mut reader),
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[test]
fn test_read_frame_too_large() {
    let huge_len: u32 = 16 * 1024 * 1024 + 1;
    let data = huge_len.to_be_bytes().to_vec();

    let result = read_frame(&mut Cursor::new(data));
    match result {
        Err(ProtocolError::FrameTooLarge(n)) => assert_eq!(n, huge_len as usize),
        other => panic!("expected FrameTooLarge, got {:?}", other),
    }
}

#[test]
fn test_read_frame_invalid_json() {
    let data = make_length_prefixed(b"this is not json");
    let result = read_frame(&mut Cursor::new(data));
    assert!(matches!(result, Err(ProtocolError::Serialization(_))));
}

#[test]
fn test_read_frame_missing_type_is_invalid() {
    let data = make_length_prefixed(br#"{"payload": 1}"#);
    let result = read_frame(&mut Cursor::new(data));
    assert!(matches!(result, Err(ProtocolError::Serialization(_))));
}

#[test]
fn test_read_frame_missing_payload_defaults_to_null() {
    let data = make_length_prefixed(br#"{"type": "c_script_end"}"#);
    let frame = read_frame(&mut Cursor::new(data)).unwrap();
    assert!(frame.payload.is_null());
}

#[test]
fn test_read_frame_truncated_length() {
    let result = read_frame(&mut Cursor::new(vec![0u8, 1]));
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[test]
fn test_read_frame_truncated_body() {
    let mut data = Vec::new();
    data.extend_from_slice(&100u32.to_be_bytes());
    data.extend_from_slice(&[1, 2, 3, 4, 5]);

    let result = read_frame(&mut Cursor::new(data));
    assert!(result.unwrap_err().is_connection_error());
}

#[test]
fn test_read_frame_empty_stream() {
    let result = read_frame(&mut Cursor::new(Vec::<u8>::new()));
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}
