//! Unit tests for the header list codec and its lazy primitives.

use bytes::BytesMut;
use rstest::rstest;

use super::*;
use crate::wire::BodyReader;

fn sample(entries: &[(&str, &str)]) -> Headers {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn encode(headers: &Headers) -> BytesMut {
    let mut dst = BytesMut::new();
    headers.write_into(&mut dst).expect("encode failed");
    dst
}

#[rstest]
#[case(sample(&[]))]
#[case(sample(&[("cn", "caller")]))]
#[case(sample(&[("cn", "a"), ("rd", "b"), ("as", "thrift")]))]
#[case(sample(&[("cn", "first"), ("cn", "second")]))]
#[case(sample(&[("", ""), ("k", "")]))]
fn roundtrip_preserves_order_and_duplicates(#[case] headers: Headers) {
    let dst = encode(&headers);
    assert_eq!(dst.len(), headers.byte_length());

    let mut reader = BodyReader::new(&dst);
    let decoded = Headers::read_from(&mut reader).expect("decode failed");
    assert_eq!(decoded, headers);
    assert!(reader.is_empty());
}

#[test]
fn get_returns_first_occurrence() {
    let headers = sample(&[("cn", "first"), ("cn", "second")]);
    assert_eq!(headers.get("cn"), Some("first"));
    assert_eq!(headers.get("rd"), None);
}

#[test]
fn too_many_entries_rejected() {
    let headers: Headers = (0..=HEADER_COUNT_MAX)
        .map(|i| (format!("k{i}"), String::new()))
        .collect();
    let mut dst = BytesMut::new();
    let err = headers.write_into(&mut dst).unwrap_err();
    assert!(matches!(
        err,
        WireError::LengthOverflow { len: 256, max: 255, .. }
    ));
}

#[test]
fn skip_matches_full_read() {
    let headers = sample(&[("cn", "caller"), ("rd", "delegate")]);
    let dst = encode(&headers);

    let end = skip(&dst, 0).expect("skip failed");
    assert_eq!(end, headers.byte_length());
}

#[test]
fn skip_rejects_truncated_entry() {
    let dst = encode(&sample(&[("cn", "caller")]));
    let err = skip(&dst[..dst.len() - 2], 0).unwrap_err();
    assert!(matches!(err, WireError::BufferTooShort { .. }));
}

#[test]
fn raw_headers_iterates_wire_order() {
    let dst = encode(&sample(&[("cn", "a"), ("rd", "b")]));

    let mut raw = RawHeaders::parse(&dst, 0).expect("parse failed");
    assert_eq!(raw.remaining(), 2);
    assert_eq!(
        raw.next().expect("entry").expect("entry valid"),
        (&b"cn"[..], &b"a"[..])
    );
    assert_eq!(
        raw.next().expect("entry").expect("entry valid"),
        (&b"rd"[..], &b"b"[..])
    );
    assert!(raw.next().is_none());
}

#[test]
fn raw_headers_stops_after_error() {
    let dst = encode(&sample(&[("cn", "caller")]));
    let truncated = &dst[..dst.len() - 3];

    let mut raw = RawHeaders::parse(truncated, 0).expect("count byte present");
    assert!(raw.next().expect("entry").is_err());
    assert!(raw.next().is_none());
}

#[rstest]
#[case(&[("cn", "a"), ("rd", "b")], Some("a"), Some("b"))]
#[case(&[("rd", "b")], None, Some("b"))]
#[case(&[("as", "thrift"), ("other", "x")], None, None)]
#[case(&[("cn", "first"), ("cn", "second")], Some("first"), None)]
#[case(&[], None, None)]
fn scan_finds_first_occurrences(
    #[case] entries: &[(&str, &str)],
    #[case] cn: Option<&str>,
    #[case] rd: Option<&str>,
) {
    let headers = sample(entries);
    let dst = encode(&headers);

    let scan = scan_short_keys(&dst, 0, [short_key(*b"cn"), short_key(*b"rd")])
        .expect("scan failed");
    assert_eq!(scan.end, headers.byte_length());

    for (hit, expected) in scan.hits.into_iter().zip([cn, rd]) {
        match (hit, expected) {
            (Some(offset), Some(value)) => {
                let mut reader = BodyReader::starting_at(&dst, offset);
                assert_eq!(reader.read_str1_bytes().expect("value"), value.as_bytes());
            }
            (None, None) => {}
            (hit, expected) => panic!("scan hit {hit:?}, expected {expected:?}"),
        }
    }
}

#[test]
fn scan_ignores_long_keys_cheaply() {
    // A 3-byte key that *contains* "cn" must not match.
    let headers = sample(&[("cnx", "no"), ("cn", "yes")]);
    let dst = encode(&headers);

    let scan = scan_short_keys(&dst, 0, [short_key(*b"cn")]).expect("scan failed");
    let offset = scan.hits[0].expect("cn present");
    let mut reader = BodyReader::starting_at(&dst, offset);
    assert_eq!(reader.read_str1_bytes().expect("value"), b"yes");
}

#[test]
fn scan_fails_without_partial_results_on_truncation() {
    let dst = encode(&sample(&[("cn", "a"), ("rd", "b")]));
    let err =
        scan_short_keys(&dst[..dst.len() - 1], 0, [short_key(*b"rd")]).unwrap_err();
    assert!(matches!(err, WireError::BufferTooShort { .. }));
}
