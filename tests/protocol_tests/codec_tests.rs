//! Codec Tests
//!
//! Tests for RESP encoding and the streaming decoder.

use std::io::{BufReader, Cursor, Read};

use bytes::Bytes;
use relaykv::protocol::codec::DEFAULT_MAX_DEPTH;
use relaykv::protocol::{decode_one, encode, encode_request, Decoder, WireValue};
use relaykv::RelayError;

// =============================================================================
// Helper Functions
// =============================================================================

fn decode_all(bytes: &[u8]) -> Vec<WireValue> {
    Decoder::new(Cursor::new(bytes))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn decode_err(bytes: &[u8]) -> RelayError {
    Decoder::new(Cursor::new(bytes)).decode().unwrap_err()
}

/// Reader that hands out one byte per read call
struct Trickle {
    data: Vec<u8>,
    pos: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pos >= self.data.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.data[self.pos];
        self.pos += 1;
        Ok(1)
    }
}

fn sample_values() -> Vec<WireValue> {
    vec![
        WireValue::simple("OK"),
        WireValue::error("ERR something broke"),
        WireValue::Integer(-42),
        WireValue::bulk(Bytes::from_static(b"hello\r\nworld")),
        WireValue::bulk(Bytes::new()),
        WireValue::null_bulk(),
        WireValue::array(vec![]),
        WireValue::null_array(),
        WireValue::array(vec![
            WireValue::Integer(1),
            WireValue::array(vec![WireValue::null_bulk(), WireValue::simple("nested")]),
            WireValue::null_array(),
        ]),
    ]
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_each_variant() {
    assert_eq!(encode(&WireValue::simple("PONG")), b"+PONG\r\n");
    assert_eq!(encode(&WireValue::error("ERR bad")), b"-ERR bad\r\n");
    assert_eq!(encode(&WireValue::Integer(1000)), b":1000\r\n");
    assert_eq!(encode(&WireValue::Integer(-7)), b":-7\r\n");
    assert_eq!(encode(&WireValue::bulk(Bytes::from_static(b"hey"))), b"$3\r\nhey\r\n");
    assert_eq!(encode(&WireValue::null_bulk()), b"$-1\r\n");
    assert_eq!(encode(&WireValue::null_array()), b"*-1\r\n");
    assert_eq!(encode(&WireValue::array(vec![])), b"*0\r\n");
}

#[test]
fn test_encode_empty_bulk_differs_from_null() {
    assert_eq!(encode(&WireValue::bulk(Bytes::new())), b"$0\r\n\r\n");
    assert_ne!(encode(&WireValue::bulk(Bytes::new())), encode(&WireValue::null_bulk()));
}

#[test]
fn test_encode_nested_array() {
    let value = WireValue::array(vec![
        WireValue::bulk(Bytes::from_static(b"subscribe")),
        WireValue::bulk(Bytes::from_static(b"chan")),
        WireValue::Integer(1),
    ]);
    assert_eq!(
        encode(&value),
        b"*3\r\n$9\r\nsubscribe\r\n$4\r\nchan\r\n:1\r\n".to_vec()
    );
}

#[test]
fn test_encode_request() {
    assert_eq!(
        encode_request(["ECHO", "hey"]),
        b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n".to_vec()
    );
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_round_trip_all_variants() {
    for value in sample_values() {
        let decoded = decode_one(&encode(&value)).unwrap();
        assert_eq!(decoded, Some(value));
    }
}

#[test]
fn test_round_trip_pipelined_stream() {
    let values = sample_values();
    let stream: Vec<u8> = values.iter().flat_map(encode).collect();

    assert_eq!(decode_all(&stream), values);
}

#[test]
fn test_decode_one_byte_at_a_time() {
    let values = sample_values();
    let stream: Vec<u8> = values.iter().flat_map(encode).collect();

    let reader = BufReader::with_capacity(1, Trickle { data: stream, pos: 0 });
    let decoded = Decoder::new(reader)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(decoded, values);
}

#[test]
fn test_decode_tolerates_bare_lf() {
    assert_eq!(decode_all(b"+OK\n:12\n"), vec![
        WireValue::simple("OK"),
        WireValue::Integer(12),
    ]);
}

#[test]
fn test_decode_error_is_its_own_kind() {
    let decoded = decode_one(b"-ERR nope\r\n").unwrap().unwrap();
    assert_eq!(decoded, WireValue::Error("ERR nope".to_string()));
    assert_ne!(decoded, WireValue::simple("ERR nope"));
}

#[test]
fn test_decode_null_and_empty_are_distinct() {
    assert_eq!(decode_all(b"$-1\r\n$0\r\n\r\n*-1\r\n*0\r\n"), vec![
        WireValue::null_bulk(),
        WireValue::bulk(Bytes::new()),
        WireValue::null_array(),
        WireValue::array(vec![]),
    ]);
}

#[test]
fn test_is_null_only_for_null_variants() {
    let decoded = decode_all(b"$-1\r\n$0\r\n\r\n*-1\r\n*0\r\n");
    let nulls: Vec<bool> = decoded.iter().map(WireValue::is_null).collect();

    assert_eq!(nulls, vec![true, false, true, false]);
}

#[test]
fn test_decode_binary_bulk_string() {
    let payload: Vec<u8> = (0..=255).collect();
    let value = WireValue::bulk(Bytes::from(payload));

    assert_eq!(decode_one(&encode(&value)).unwrap(), Some(value));
}

#[test]
fn test_decode_bulk_with_bad_trailer_keeps_payload() {
    // Two bytes are consumed as the trailer whatever they are
    let decoded = decode_all(b"$3\r\nfooXY+OK\r\n");

    assert_eq!(decoded, vec![
        WireValue::bulk(Bytes::from_static(b"foo")),
        WireValue::simple("OK"),
    ]);
}

#[test]
fn test_decode_bulk_missing_trailer_at_end_of_stream() {
    let decoded = decode_all(b"$3\r\nfoo");
    assert_eq!(decoded, vec![WireValue::bulk(Bytes::from_static(b"foo"))]);
}

// =============================================================================
// Inline Command Tests
// =============================================================================

#[test]
fn test_decode_inline_command() {
    let decoded = decode_one(b"SET foo  bar\r\n").unwrap().unwrap();

    assert_eq!(decoded, WireValue::array(vec![
        WireValue::simple("SET"),
        WireValue::simple("foo"),
        WireValue::simple("bar"),
    ]));
}

#[test]
fn test_decode_inline_then_resp() {
    let decoded = decode_all(b"PING\n*1\r\n$4\r\nPING\r\n");

    assert_eq!(decoded, vec![
        WireValue::array(vec![WireValue::simple("PING")]),
        WireValue::array(vec![WireValue::bulk(Bytes::from_static(b"PING"))]),
    ]);
}

#[test]
fn test_decode_empty_inline_lines() {
    assert_eq!(decode_all(b"\r\n\n"), vec![
        WireValue::array(vec![]),
        WireValue::array(vec![]),
    ]);
}

// =============================================================================
// Error / End-of-Stream Tests
// =============================================================================

#[test]
fn test_decode_end_of_stream() {
    assert_eq!(decode_one(b"").unwrap(), None);

    let mut decoder = Decoder::new(Cursor::new(&b"+OK\r\n"[..]));
    assert!(decoder.decode().unwrap().is_some());
    assert!(decoder.decode().unwrap().is_none());
}

#[test]
fn test_decode_truncated_frames() {
    let truncated: [&[u8]; 6] = [
        b"+OK",
        b":12",
        b"$5\r\nab",
        b"$5",
        b"*2\r\n$1\r\na\r\n",
        b"*3\r\n:1\r\n",
    ];
    for bytes in truncated {
        assert!(
            matches!(decode_err(bytes), RelayError::Protocol(_)),
            "expected protocol error for {:?}",
            String::from_utf8_lossy(bytes)
        );
    }
}

#[test]
fn test_decode_invalid_numbers() {
    let invalid: [&[u8]; 5] = [
        b":12x\r\n",
        b"$abc\r\n",
        b"*two\r\n",
        b"$-2\r\n",
        b"*-5\r\n",
    ];
    for bytes in invalid {
        assert!(
            matches!(decode_err(bytes), RelayError::Protocol(_)),
            "expected protocol error for {:?}",
            String::from_utf8_lossy(bytes)
        );
    }
}

#[test]
fn test_decode_rejects_oversized_bulk() {
    let mut decoder =
        Decoder::new(Cursor::new(&b"$5\r\nhello\r\n"[..])).with_max_bulk_len(4);
    assert!(matches!(decoder.decode(), Err(RelayError::Protocol(_))));

    let mut decoder = Decoder::new(Cursor::new(&b"*5\r\n"[..])).with_max_bulk_len(4);
    assert!(matches!(decoder.decode(), Err(RelayError::Protocol(_))));
}

#[test]
fn test_decode_rejects_overlong_line() {
    let mut line = vec![b'+'];
    line.extend(std::iter::repeat(b'a').take(70 * 1024));
    line.extend_from_slice(b"\r\n");

    assert!(matches!(decode_err(&line), RelayError::Protocol(_)));
}

// =============================================================================
// Nesting Tests
// =============================================================================

/// `depth` arrays, each wrapping the next, around a single simple string
fn nested(depth: usize) -> Vec<u8> {
    let mut bytes = b"*1\r\n".repeat(depth);
    bytes.extend_from_slice(b"+x\r\n");
    bytes
}

#[test]
fn test_decode_nesting_up_to_limit() {
    let decoded = decode_one(&nested(DEFAULT_MAX_DEPTH)).unwrap().unwrap();

    let mut depth = 0;
    let mut current = &decoded;
    while let WireValue::Array(Some(items)) = current {
        depth += 1;
        current = &items[0];
    }
    assert_eq!(depth, DEFAULT_MAX_DEPTH);
    assert_eq!(current, &WireValue::simple("x"));
}

#[test]
fn test_decode_rejects_nesting_past_limit() {
    assert!(matches!(
        decode_err(&nested(DEFAULT_MAX_DEPTH + 1)),
        RelayError::Protocol(_)
    ));
}

#[test]
fn test_decode_rejects_deep_nesting_early() {
    // Deep enough to exhaust a thread stack if every level recursed
    let bytes = nested(2_000_000);
    let mut decoder = Decoder::new(Cursor::new(&bytes[..])).with_max_depth(4);

    assert!(matches!(decoder.decode(), Err(RelayError::Protocol(_))));
}

#[test]
fn test_decode_custom_depth_allows_flat_arrays() {
    let mut decoder = Decoder::new(Cursor::new(&b"*2\r\n:1\r\n:2\r\n*1\r\n*0\r\n"[..]))
        .with_max_depth(1);

    assert_eq!(
        decoder.decode().unwrap(),
        Some(WireValue::array(vec![WireValue::Integer(1), WireValue::Integer(2)]))
    );
    assert!(matches!(decoder.decode(), Err(RelayError::Protocol(_))));
}
