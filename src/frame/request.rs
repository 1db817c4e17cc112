//! Lazy field extraction from CallRequest frames.

use bytes::Bytes;

use super::{cached_offset, read_first_arg, utf8_slot, LazyField, OffsetCache, Slot};
use crate::{
    body::FRAGMENT_FLAG,
    checksum,
    error::WireError,
    headers::{
        scan_short_keys, short_key, RawHeaders, CALLER_NAME_KEY, ROUTING_DELEGATE_KEY,
    },
    trace::Tracing,
    wire::BodyReader,
};

const FLAGS_AT: usize = 0;
const TTL_AT: usize = 1;
const TRACING_AT: usize = 5;
const SERVICE_AT: usize = 30;

/// Probe table for the fast-path header scan. Extend here when another
/// two-byte key needs hot-path extraction.
const SCAN_KEYS: [u16; 2] = [short_key(CALLER_NAME_KEY), short_key(ROUTING_DELEGATE_KEY)];
const CN: usize = 0;
const RD: usize = 1;

/// A received CallRequest frame with lazy, cache-backed field accessors.
///
/// The wrapper owns the call-body bytes (the framing layer hands over the
/// valid region of a received frame) and an [`OffsetCache`] that lives and
/// dies with it. Accessors are idempotent: the first call may walk part of
/// the body, repeated calls are O(1).
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use callwire::{body::CallRequest, frame::{LazyField, RequestFrame}};
///
/// let mut headers = callwire::headers::Headers::new();
/// headers.push("cn", "gateway");
/// let body = CallRequest {
///     flags: 0,
///     ttl: 100,
///     tracing: callwire::trace::Tracing::default(),
///     service: "orders".into(),
///     headers,
///     checksum: callwire::checksum::Checksum::default(),
///     args: vec![Bytes::from_static(b"get")],
/// };
///
/// let frame = RequestFrame::new(body.encode(true).unwrap());
/// assert_eq!(frame.service(), LazyField::Value("orders"));
/// assert_eq!(frame.caller_name(), LazyField::Value("gateway"));
/// assert!(frame.routing_delegate().is_absent());
/// assert_eq!(frame.ttl(), LazyField::Value(100));
/// ```
#[derive(Debug)]
pub struct RequestFrame {
    body: Bytes,
    cache: OffsetCache,
}

impl RequestFrame {
    /// Wrap the call-body region of a received frame.
    #[must_use]
    pub fn new(body: Bytes) -> Self {
        Self {
            body,
            cache: OffsetCache::default(),
        }
    }

    /// The raw body bytes this reader wraps.
    #[must_use]
    pub fn body(&self) -> &[u8] { &self.body }

    /// The frame's offset cache, for instrumentation and tests.
    #[must_use]
    pub fn cache(&self) -> &OffsetCache { &self.cache }

    /// The most recent reason a lazy read on this frame gave up.
    #[must_use]
    pub fn last_error(&self) -> Option<WireError> { self.cache.last_error() }

    /// The flags byte.
    pub fn flags(&self) -> LazyField<u8> {
        let mut reader = BodyReader::starting_at(&self.body, FLAGS_AT);
        match reader.read_u8() {
            Ok(flags) => LazyField::Value(flags),
            Err(err) => {
                self.cache.record(err);
                LazyField::Unavailable
            }
        }
    }

    /// Whether this body completes the logical call (fragment bit clear).
    pub fn is_terminal(&self) -> LazyField<bool> {
        self.flags().map(|flags| flags & FRAGMENT_FLAG == 0)
    }

    /// The ttl in milliseconds, as carried on the wire.
    ///
    /// The lazy reader reports the raw value; only the structured decoder
    /// enforces that it is positive.
    pub fn ttl(&self) -> LazyField<u32> {
        self.cache
            .ttl
            .get_or_init(|| {
                let mut reader = BodyReader::starting_at(&self.body, TTL_AT);
                match reader.read_u32() {
                    Ok(ttl) => Slot::Ready(ttl),
                    Err(err) => {
                        self.cache.record(err);
                        Slot::Failed
                    }
                }
            })
            .as_lazy()
            .map(|ttl| *ttl)
    }

    /// The raw 25-byte tracing record.
    pub fn tracing_raw(&self) -> LazyField<&[u8]> {
        let end = TRACING_AT + Tracing::LEN;
        if self.body.len() >= end {
            LazyField::Value(&self.body[TRACING_AT..end])
        } else {
            self.cache.record(WireError::BufferTooShort {
                offset: TRACING_AT,
                need: Tracing::LEN,
                have: self.body.len().saturating_sub(TRACING_AT),
            });
            LazyField::Unavailable
        }
    }

    /// The decoded tracing record.
    pub fn tracing(&self) -> LazyField<Tracing> {
        self.cache
            .tracing
            .get_or_init(|| {
                let mut reader = BodyReader::starting_at(&self.body, TRACING_AT);
                match Tracing::read_from(&mut reader) {
                    Ok(tracing) => Slot::Ready(tracing),
                    Err(err) => {
                        self.cache.record(err);
                        Slot::Failed
                    }
                }
            })
            .as_lazy()
            .map(|tracing| *tracing)
    }

    /// The service name, UTF-8 validated.
    ///
    /// A zero-length service is the valid empty string.
    pub fn service(&self) -> LazyField<&str> {
        self.cache
            .service
            .get_or_init(|| {
                let mut reader = BodyReader::starting_at(&self.body, SERVICE_AT);
                match reader.read_str1_bytes() {
                    Ok(bytes) => utf8_slot(&self.cache, bytes, SERVICE_AT + 1, "service"),
                    Err(err) => {
                        self.cache.record(err);
                        Slot::Failed
                    }
                }
            })
            .as_lazy()
            .map(|service| &**service)
    }

    /// The service name as raw bytes, for consumers that route on opaque
    /// keys instead of rejecting invalid UTF-8.
    pub fn service_raw(&self) -> LazyField<&[u8]> {
        let mut reader = BodyReader::starting_at(&self.body, SERVICE_AT);
        match reader.read_str1_bytes() {
            Ok(bytes) => LazyField::Value(bytes),
            Err(err) => {
                self.cache.record(err);
                LazyField::Unavailable
            }
        }
    }

    /// Iterate the transport headers without materializing them.
    pub fn headers(&self) -> LazyField<RawHeaders<'_>> {
        let Some(start) = self.header_start() else {
            return LazyField::Unavailable;
        };
        match RawHeaders::parse(&self.body, start) {
            Ok(raw) => LazyField::Value(raw),
            Err(err) => {
                self.cache.record(err);
                LazyField::Unavailable
            }
        }
    }

    /// The first `cn` header value, UTF-8 validated.
    pub fn caller_name(&self) -> LazyField<&str> {
        self.cache
            .caller_name
            .get_or_init(|| self.header_value_slot(CN, "cn header"))
            .as_lazy()
            .map(|name| &**name)
    }

    /// The first `cn` header value as raw bytes.
    pub fn caller_name_raw(&self) -> LazyField<&[u8]> { self.header_value_raw(CN) }

    /// The first `rd` header value, UTF-8 validated.
    pub fn routing_delegate(&self) -> LazyField<&str> {
        self.cache
            .routing_delegate
            .get_or_init(|| self.header_value_slot(RD, "rd header"))
            .as_lazy()
            .map(|delegate| &**delegate)
    }

    /// The first `rd` header value as raw bytes.
    pub fn routing_delegate_raw(&self) -> LazyField<&[u8]> { self.header_value_raw(RD) }

    /// The first argument, UTF-8 validated.
    ///
    /// Absent when the body carries no args at all.
    pub fn arg1(&self) -> LazyField<&str> {
        self.cache
            .arg1
            .get_or_init(|| self.compute_arg1())
            .as_lazy()
            .map(|arg| &**arg)
    }

    /// The first argument as raw bytes.
    pub fn arg1_raw(&self) -> LazyField<&[u8]> {
        let Some(start) = self.args_start() else {
            return LazyField::Unavailable;
        };
        match read_first_arg(&self.body, start) {
            Ok(Some(bytes)) => LazyField::Value(bytes),
            Ok(None) => LazyField::Absent,
            Err(err) => {
                self.cache.record(err);
                LazyField::Unavailable
            }
        }
    }

    /// Offset of the header list, computed from the service length.
    fn header_start(&self) -> Option<usize> {
        cached_offset(&self.cache.header_start, || {
            let mut reader = BodyReader::starting_at(&self.body, SERVICE_AT);
            match reader.read_str1_bytes() {
                Ok(_) => Some(reader.pos()),
                Err(err) => {
                    self.cache.record(err);
                    None
                }
            }
        })
    }

    /// Run the header scan once, committing the `cn`/`rd` value offsets and
    /// the checksum-start offset together. Returns whether they are
    /// available.
    fn scan(&self) -> bool {
        if self.cache.csum_start.get().is_some() {
            return true;
        }
        let Some(start) = self.header_start() else {
            return false;
        };
        match scan_short_keys(&self.body, start, SCAN_KEYS) {
            Ok(scan) => {
                let _ = self.cache.cn_value.set(scan.hits[CN]);
                let _ = self.cache.rd_value.set(scan.hits[RD]);
                let _ = self.cache.csum_start.set(scan.end);
                true
            }
            Err(err) => {
                self.cache.record(err);
                false
            }
        }
    }

    fn probe_offset(&self, probe: usize) -> LazyField<usize> {
        if !self.scan() {
            return LazyField::Unavailable;
        }
        let cell = match probe {
            CN => &self.cache.cn_value,
            _ => &self.cache.rd_value,
        };
        match cell.get() {
            Some(Some(offset)) => LazyField::Value(*offset),
            Some(None) => LazyField::Absent,
            None => LazyField::Unavailable,
        }
    }

    fn header_value_raw(&self, probe: usize) -> LazyField<&[u8]> {
        match self.probe_offset(probe) {
            LazyField::Value(offset) => {
                let mut reader = BodyReader::starting_at(&self.body, offset);
                match reader.read_str1_bytes() {
                    Ok(bytes) => LazyField::Value(bytes),
                    Err(err) => {
                        self.cache.record(err);
                        LazyField::Unavailable
                    }
                }
            }
            LazyField::Absent => LazyField::Absent,
            LazyField::Unavailable => LazyField::Unavailable,
        }
    }

    fn header_value_slot(&self, probe: usize, field: &'static str) -> Slot<Box<str>> {
        match self.probe_offset(probe) {
            LazyField::Value(offset) => {
                let mut reader = BodyReader::starting_at(&self.body, offset);
                match reader.read_str1_bytes() {
                    Ok(bytes) => utf8_slot(&self.cache, bytes, offset + 1, field),
                    Err(err) => {
                        self.cache.record(err);
                        Slot::Failed
                    }
                }
            }
            LazyField::Absent => Slot::Absent,
            LazyField::Unavailable => Slot::Failed,
        }
    }

    /// Offset of the args region: one checksum-width past the scan's end.
    fn args_start(&self) -> Option<usize> {
        if !self.scan() {
            return None;
        }
        let csum_start = self.cache.csum_start.get().copied()?;
        match checksum::skip(&self.body, csum_start) {
            Ok(end) => Some(end),
            Err(err) => {
                self.cache.record(err);
                None
            }
        }
    }

    fn compute_arg1(&self) -> Slot<Box<str>> {
        let Some(start) = self.args_start() else {
            return Slot::Failed;
        };
        match read_first_arg(&self.body, start) {
            Ok(Some(bytes)) => utf8_slot(&self.cache, bytes, start + 2, "arg1"),
            Ok(None) => Slot::Absent,
            Err(err) => {
                self.cache.record(err);
                Slot::Failed
            }
        }
    }
}
