//! Tests for the wire protocol
//!
//! These tests verify:
//! - Request/response framing round trips
//! - The JSON message shapes (type tags, status names)
//! - Oversized frame rejection

use std::io::Cursor;

use emberkv::protocol::{
    read_request, read_response, write_request, write_response, Request, Response, Status,
    MAX_FRAME_SIZE,
};
use emberkv::EmberError;

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_request_round_trip() {
    let requests = vec![
        Request::Get {
            key: "k".to_string(),
        },
        Request::Set {
            key: "k".to_string(),
            value: "v".to_string(),
        },
        Request::Remove {
            key: "k".to_string(),
        },
    ];

    for request in requests {
        let mut buf = Vec::new();
        write_request(&mut buf, &request).unwrap();

        let decoded = read_request(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, request);
    }
}

#[test]
fn test_response_round_trip() {
    let responses = vec![
        Response::success(Some("value".to_string())),
        Response::success(None),
        Response::not_found(),
        Response::error("boom"),
    ];

    for response in responses {
        let mut buf = Vec::new();
        write_response(&mut buf, &response).unwrap();

        let decoded = read_response(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, response);
    }
}

#[test]
fn test_multiple_frames_in_sequence() {
    let mut buf = Vec::new();
    write_request(
        &mut buf,
        &Request::Set {
            key: "a".to_string(),
            value: "1".to_string(),
        },
    )
    .unwrap();
    write_request(
        &mut buf,
        &Request::Get {
            key: "a".to_string(),
        },
    )
    .unwrap();

    let mut cursor = Cursor::new(&buf);
    assert!(matches!(
        read_request(&mut cursor).unwrap(),
        Request::Set { .. }
    ));
    assert!(matches!(
        read_request(&mut cursor).unwrap(),
        Request::Get { .. }
    ));
}

// =============================================================================
// Wire Shape Tests
// =============================================================================

#[test]
fn test_request_wire_shape() {
    let mut buf = Vec::new();
    write_request(
        &mut buf,
        &Request::Set {
            key: "a".to_string(),
            value: "1".to_string(),
        },
    )
    .unwrap();

    // 4-byte big-endian length, then the JSON payload.
    let payload_len = u32::from_be_bytes(buf[..4].try_into().unwrap()) as usize;
    assert_eq!(buf.len(), 4 + payload_len);

    let text = std::str::from_utf8(&buf[4..]).unwrap();
    assert!(text.contains("\"type\":\"SET\""));
    assert!(text.contains("\"key\":\"a\""));
    assert!(text.contains("\"value\":\"1\""));
}

#[test]
fn test_status_names() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::not_found()).unwrap();
    let text = std::str::from_utf8(&buf[4..]).unwrap();
    assert!(text.contains("\"status\":\"NOT_FOUND\""));

    let mut buf = Vec::new();
    write_response(&mut buf, &Response::success(None)).unwrap();
    let text = std::str::from_utf8(&buf[4..]).unwrap();
    assert!(text.contains("\"status\":\"SUCCESS\""));
    // Absent values are omitted, not serialized as null.
    assert!(!text.contains("value"));
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_oversized_frame_rejected() {
    let mut buf = (MAX_FRAME_SIZE + 1).to_be_bytes().to_vec();
    buf.extend_from_slice(b"irrelevant");

    let err = read_request(&mut Cursor::new(&buf)).unwrap_err();
    assert!(matches!(err, EmberError::Protocol(_)));
}

#[test]
fn test_garbage_payload_rejected() {
    let mut buf = 7u32.to_be_bytes().to_vec();
    buf.extend_from_slice(b"garbage");

    assert!(read_request(&mut Cursor::new(&buf)).is_err());
}

#[test]
fn test_unknown_status_rejected() {
    let payload = br#"{"status":"WAT"}"#;
    let mut buf = (payload.len() as u32).to_be_bytes().to_vec();
    buf.extend_from_slice(payload);

    assert!(read_response(&mut Cursor::new(&buf)).is_err());
}

#[test]
fn test_truncated_frame_is_io_error() {
    let mut buf = 100u32.to_be_bytes().to_vec();
    buf.extend_from_slice(b"short");

    let err = read_request(&mut Cursor::new(&buf)).unwrap_err();
    assert!(matches!(err, EmberError::Io(_)));
}
