//! Generated checks for the call-body codecs: structured round-trips,
//! length agreement, lazy/structured equivalence, and truncation safety.

use bytes::Bytes;
use callwire::{
    body::{CallRequest, CallResponse, ResponseCode},
    checksum::{Checksum, ChecksumType},
    frame::{LazyField, RequestFrame, ResponseFrame},
    headers::Headers,
    trace::Tracing,
    FRAGMENT_FLAG,
};
use proptest::prelude::*;

fn arb_tracing() -> impl Strategy<Value = Tracing> {
    (any::<u64>(), any::<u64>(), any::<u64>(), any::<u8>()).prop_map(
        |(span_id, parent_id, trace_id, flags)| Tracing {
            span_id,
            parent_id,
            trace_id,
            flags,
        },
    )
}

fn arb_checksum() -> impl Strategy<Value = Checksum> {
    prop_oneof![
        Just(Checksum::default()),
        any::<u32>().prop_map(|d| Checksum::new(ChecksumType::Crc32, Some(d))),
        any::<u32>().prop_map(|d| Checksum::new(ChecksumType::Farmhash, Some(d))),
        any::<u32>().prop_map(|d| Checksum::new(ChecksumType::Crc32c, Some(d))),
    ]
}

/// Header keys drawn mostly from the fast-path set so the scan paths get
/// exercised, including duplicates.
fn arb_headers() -> impl Strategy<Value = Headers> {
    proptest::collection::vec(
        (
            prop_oneof![
                Just("cn".to_owned()),
                Just("rd".to_owned()),
                Just("as".to_owned()),
                "[a-z]{0,4}",
            ],
            "[a-z0-9]{0,8}",
        ),
        0..5,
    )
    .prop_map(|entries| entries.into_iter().collect())
}

fn arb_args() -> impl Strategy<Value = Vec<Bytes>> {
    proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(Bytes::from),
        0..4,
    )
}

fn arb_request() -> impl Strategy<Value = CallRequest> {
    (
        any::<u8>(),
        1u32..,
        arb_tracing(),
        "[a-z.]{0,12}",
        arb_headers(),
        arb_checksum(),
        arb_args(),
    )
        .prop_map(|(flags, ttl, tracing, service, headers, checksum, args)| CallRequest {
            // A terminal encode clears the fragment bit, so arbitrary bodies
            // carry it cleared to round-trip exactly.
            flags: flags & !FRAGMENT_FLAG,
            ttl,
            tracing,
            service,
            headers,
            checksum,
            args,
        })
}

fn arb_response() -> impl Strategy<Value = CallResponse> {
    (
        any::<u8>(),
        any::<u8>(),
        arb_tracing(),
        arb_headers(),
        arb_checksum(),
        arb_args(),
    )
        .prop_map(|(flags, code, tracing, headers, checksum, args)| CallResponse {
            flags: flags & !FRAGMENT_FLAG,
            code: ResponseCode::from_wire(code),
            tracing,
            headers,
            checksum,
            args,
        })
}

/// A prefix accessor may give up, but whatever it reports must match the
/// full frame.
fn agrees<T: PartialEq + std::fmt::Debug>(prefix: &LazyField<T>, full: &LazyField<T>) -> bool {
    prefix.is_unavailable() || prefix == full
}

/// `arg1` may also legitimately read as absent when the cut lands exactly
/// on an arg boundary: that prefix is itself a well-formed body with fewer
/// args.
fn arg1_agrees<T: PartialEq + std::fmt::Debug>(prefix: &LazyField<T>, full: &LazyField<T>) -> bool {
    prefix.is_unavailable() || prefix.is_absent() || prefix == full
}

proptest! {
    #[test]
    fn request_roundtrip_and_length_agree(request in arb_request()) {
        let wire = request.encode(true).expect("encode failed");
        prop_assert_eq!(wire.len(), request.byte_length());
        prop_assert_eq!(&CallRequest::decode(&wire).expect("decode failed"), &request);

        let fragment = request.encode(false).expect("encode failed");
        let decoded = CallRequest::decode(&fragment).expect("decode failed");
        prop_assert_eq!(decoded.flags, request.flags | FRAGMENT_FLAG);
    }

    #[test]
    fn response_roundtrip_and_length_agree(response in arb_response()) {
        let wire = response.encode(true).expect("encode failed");
        prop_assert_eq!(wire.len(), response.byte_length());
        prop_assert_eq!(&CallResponse::decode(&wire).expect("decode failed"), &response);
    }

    #[test]
    fn lazy_request_matches_structured(request in arb_request()) {
        let wire = request.encode(true).expect("encode failed");
        let frame = RequestFrame::new(wire);

        prop_assert_eq!(frame.service(), LazyField::Value(request.service.as_str()));
        prop_assert_eq!(frame.ttl(), LazyField::Value(request.ttl));
        prop_assert_eq!(frame.tracing(), LazyField::Value(request.tracing));
        prop_assert_eq!(frame.flags(), LazyField::Value(request.flags & !FRAGMENT_FLAG));

        match request.headers.get("cn") {
            Some(value) => prop_assert_eq!(frame.caller_name(), LazyField::Value(value)),
            None => prop_assert!(frame.caller_name().is_absent()),
        }
        match request.headers.get("rd") {
            Some(value) => prop_assert_eq!(frame.routing_delegate(), LazyField::Value(value)),
            None => prop_assert!(frame.routing_delegate().is_absent()),
        }
        match request.args.first() {
            Some(arg) => prop_assert_eq!(frame.arg1_raw(), LazyField::Value(&arg[..])),
            None => prop_assert!(frame.arg1_raw().is_absent()),
        }

        // Second reads come from the cache and must agree.
        prop_assert_eq!(frame.service(), LazyField::Value(request.service.as_str()));
        prop_assert_eq!(frame.ttl(), LazyField::Value(request.ttl));
    }

    #[test]
    fn lazy_response_matches_structured(response in arb_response()) {
        let wire = response.encode(true).expect("encode failed");
        let frame = ResponseFrame::new(wire);

        prop_assert_eq!(frame.code(), LazyField::Value(response.code));
        prop_assert_eq!(frame.tracing(), LazyField::Value(response.tracing));
        match response.args.first() {
            Some(arg) => prop_assert_eq!(frame.arg1_raw(), LazyField::Value(&arg[..])),
            None => prop_assert!(frame.arg1_raw().is_absent()),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_request_prefix_is_safe(request in arb_request()) {
        let wire = request.encode(true).expect("encode failed");
        let full = RequestFrame::new(wire.clone());

        for len in 0..wire.len() {
            let prefix = RequestFrame::new(wire.slice(..len));
            prop_assert!(agrees(&prefix.flags(), &full.flags()));
            prop_assert!(agrees(&prefix.is_terminal(), &full.is_terminal()));
            prop_assert!(agrees(&prefix.ttl(), &full.ttl()));
            prop_assert!(agrees(&prefix.tracing(), &full.tracing()));
            prop_assert!(agrees(&prefix.service(), &full.service()));
            prop_assert!(agrees(&prefix.caller_name(), &full.caller_name()));
            prop_assert!(agrees(&prefix.routing_delegate(), &full.routing_delegate()));
            prop_assert!(arg1_agrees(&prefix.arg1_raw(), &full.arg1_raw()));
        }
    }

    #[test]
    fn every_response_prefix_is_safe(response in arb_response()) {
        let wire = response.encode(true).expect("encode failed");
        let full = ResponseFrame::new(wire.clone());

        for len in 0..wire.len() {
            let prefix = ResponseFrame::new(wire.slice(..len));
            prop_assert!(agrees(&prefix.flags(), &full.flags()));
            prop_assert!(agrees(&prefix.code(), &full.code()));
            prop_assert!(agrees(&prefix.tracing(), &full.tracing()));
            prop_assert!(arg1_agrees(&prefix.arg1_raw(), &full.arg1_raw()));
        }
    }
}
