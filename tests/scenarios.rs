//! End-to-end scenarios over the call-frame codec: byte-for-byte encodings,
//! structured round-trips, and lazy/structured agreement.

use bytes::{Bytes, BytesMut};
use callwire::{
    body::{CallRequest, CallResponse, ResponseCode},
    checksum::{Checksum, ChecksumType},
    frame::{LazyField, RequestFrame, ResponseFrame},
    headers::Headers,
    ratelimit::{Admission, CallRateLimiter, RateLimitConfig},
    trace::Tracing,
    WireError, FRAGMENT_FLAG,
};

fn headers(entries: &[(&str, &str)]) -> Headers {
    let mut headers = Headers::new();
    for (k, v) in entries {
        headers.push(*k, *v);
    }
    headers
}

fn minimal_request() -> CallRequest {
    CallRequest {
        flags: 0,
        ttl: 1,
        tracing: Tracing::default(),
        service: "svc".into(),
        headers: headers(&[("cn", "caller")]),
        checksum: Checksum::default(),
        args: vec![Bytes::new()],
    }
}

#[test]
fn minimal_request_bytes_are_exact() {
    let mut expected = vec![0x00];
    expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
    expected.extend_from_slice(&[0u8; 25]);
    expected.push(0x03);
    expected.extend_from_slice(b"svc");
    expected.push(0x01);
    expected.push(0x02);
    expected.extend_from_slice(b"cn");
    expected.push(0x06);
    expected.extend_from_slice(b"caller");
    expected.push(0x00);
    expected.extend_from_slice(&[0x00, 0x00]);

    let request = minimal_request();
    let wire = request.encode(true).expect("encode failed");
    assert_eq!(&wire[..], expected.as_slice());
    assert_eq!(wire.len(), request.byte_length());
    assert_eq!(CallRequest::decode(&wire).expect("decode failed"), request);

    let frame = RequestFrame::new(wire);
    assert_eq!(frame.service(), LazyField::Value("svc"));
    assert_eq!(frame.caller_name(), LazyField::Value("caller"));
    assert!(frame.routing_delegate().is_absent());
    assert_eq!(frame.ttl(), LazyField::Value(1));
    assert_eq!(frame.tracing_raw(), LazyField::Value(&[0u8; 25][..]));
}

#[test]
fn frame_type_codes_are_fixed() {
    assert_eq!(CallRequest::FRAME_TYPE, 0x03);
    assert_eq!(CallResponse::FRAME_TYPE, 0x04);
}

#[test]
fn routing_delegate_scan_fills_both_offsets() {
    let mut request = minimal_request();
    request.headers = headers(&[("cn", "a"), ("rd", "b")]);
    let frame = RequestFrame::new(request.encode(true).expect("encode failed"));

    assert_eq!(frame.routing_delegate(), LazyField::Value("b"));
    assert_eq!(frame.caller_name(), LazyField::Value("a"));
    assert!(matches!(frame.cache().caller_name_offset(), Some(Some(_))));
    assert!(matches!(frame.cache().routing_delegate_offset(), Some(Some(_))));
}

#[test]
fn duplicate_caller_name_uses_first() {
    let mut request = minimal_request();
    request.headers = headers(&[("cn", "first"), ("cn", "second")]);
    let frame = RequestFrame::new(request.encode(true).expect("encode failed"));

    assert_eq!(frame.caller_name(), LazyField::Value("first"));
}

#[test]
fn fragmented_and_terminal_bodies_are_distinguished() {
    let request = minimal_request();

    let fragment = request.encode(false).expect("encode failed");
    assert_eq!(fragment[0] & FRAGMENT_FLAG, FRAGMENT_FLAG);
    assert_eq!(
        RequestFrame::new(fragment).is_terminal(),
        LazyField::Value(false)
    );

    let terminal = request.encode(true).expect("encode failed");
    assert_eq!(terminal[0] & FRAGMENT_FLAG, 0);
    assert_eq!(
        RequestFrame::new(terminal).is_terminal(),
        LazyField::Value(true)
    );
}

#[test]
fn error_response_roundtrip_and_lazy_arg1() {
    let response = CallResponse {
        flags: 0,
        code: ResponseCode::Error,
        tracing: Tracing::default(),
        headers: Headers::new(),
        checksum: Checksum::default(),
        args: vec![Bytes::from_static(b"err"), Bytes::from_static(b"msg")],
    };

    let wire = response.encode(true).expect("encode failed");
    assert_eq!(CallResponse::decode(&wire).expect("decode failed"), response);

    let frame = ResponseFrame::new(wire);
    assert_eq!(frame.code(), LazyField::Value(ResponseCode::Error));
    assert_eq!(frame.arg1(), LazyField::Value("err"));
    match frame.headers() {
        LazyField::Value(raw) => assert_eq!(raw.remaining(), 0),
        other => panic!("headers unavailable: {other:?}"),
    }
}

#[test]
fn zero_ttl_rejected_on_both_paths() {
    let mut request = minimal_request();
    request.ttl = 0;
    assert_eq!(
        request.encode(true).unwrap_err(),
        WireError::InvalidTtl { offset: 1 }
    );

    request.ttl = 1;
    let mut wire = BytesMut::from(&request.encode(true).expect("encode failed")[..]);
    wire[1..5].fill(0x00);
    assert_eq!(
        CallRequest::decode(&wire).unwrap_err(),
        WireError::InvalidTtl { offset: 1 }
    );
}

#[test]
fn unknown_checksum_tag_rejected_with_offset() {
    let request = minimal_request();
    let mut wire = BytesMut::from(&request.encode(true).expect("encode failed")[..]);
    // The checksum tag of the minimal request sits right before the args.
    let tag_at = wire.len() - 3;
    wire[tag_at] = 0x42;

    assert_eq!(
        CallRequest::decode(&wire).unwrap_err(),
        WireError::InvalidChecksumType {
            offset: tag_at,
            tag: 0x42,
        }
    );
}

#[test]
fn checksum_bearing_request_roundtrips() {
    let mut request = minimal_request();
    request.checksum = Checksum::new(ChecksumType::Crc32c, Some(0xcafe_f00d));
    request.args = vec![Bytes::from_static(b"m"), Bytes::from_static(b"body")];

    let wire = request.encode(true).expect("encode failed");
    let decoded = CallRequest::decode(&wire).expect("decode failed");
    assert_eq!(decoded, request);
    assert_eq!(decoded.checksum.digest(), Some(0xcafe_f00d));

    // The lazy path skips the digest by its width and still finds arg1.
    let frame = RequestFrame::new(wire);
    assert_eq!(frame.arg1(), LazyField::Value("m"));
}

#[test]
fn lazy_fast_path_feeds_the_rate_limiter() {
    let mut request = minimal_request();
    request.headers = headers(&[("cn", "gateway")]);
    let frame = RequestFrame::new(request.encode(true).expect("encode failed"));

    let mut limiter = CallRateLimiter::new(RateLimitConfig {
        max_calls_per_interval: 1,
        interval: std::time::Duration::from_secs(3600),
        max_tracked_pairs: 16,
    });

    let (Some(caller), Some(service)) =
        (frame.caller_name().value(), frame.service().value())
    else {
        panic!("fast-path fields must be readable");
    };
    assert_eq!(limiter.observe(caller, service), Admission::Admit);
    assert_eq!(limiter.observe(caller, service), Admission::Throttle);
}
