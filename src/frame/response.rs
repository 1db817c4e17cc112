//! Lazy field extraction from CallResponse frames.

use bytes::Bytes;

use super::{cached_offset, read_first_arg, utf8_slot, LazyField, OffsetCache, Slot};
use crate::{
    body::{ResponseCode, FRAGMENT_FLAG},
    checksum,
    error::WireError,
    headers::{self, RawHeaders},
    trace::Tracing,
    wire::BodyReader,
};

const FLAGS_AT: usize = 0;
const CODE_AT: usize = 1;
const TRACING_AT: usize = 2;
const HEADERS_AT: usize = 27;

/// A received CallResponse frame with lazy, cache-backed field accessors.
///
/// The response layout drops the ttl and service fields, so everything
/// after the fixed prefix sits 3 bytes earlier than in a request; the
/// accessor family shrinks accordingly (no caller name or routing
/// delegate, which travel on requests).
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use callwire::{
///     body::{CallResponse, ResponseCode},
///     frame::{LazyField, ResponseFrame},
/// };
///
/// let body = CallResponse {
///     flags: 0,
///     code: ResponseCode::Error,
///     tracing: callwire::trace::Tracing::default(),
///     headers: callwire::headers::Headers::new(),
///     checksum: callwire::checksum::Checksum::default(),
///     args: vec![Bytes::from_static(b"err"), Bytes::from_static(b"msg")],
/// };
///
/// let frame = ResponseFrame::new(body.encode(true).unwrap());
/// assert_eq!(frame.code(), LazyField::Value(ResponseCode::Error));
/// assert_eq!(frame.arg1_raw(), LazyField::Value(&b"err"[..]));
/// assert_eq!(frame.is_terminal(), LazyField::Value(true));
/// ```
#[derive(Debug)]
pub struct ResponseFrame {
    body: Bytes,
    cache: OffsetCache,
}

impl ResponseFrame {
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

    /// The response code.
    pub fn code(&self) -> LazyField<ResponseCode> {
        let mut reader = BodyReader::starting_at(&self.body, CODE_AT);
        match reader.read_u8() {
            Ok(code) => LazyField::Value(ResponseCode::from_wire(code)),
            Err(err) => {
                self.cache.record(err);
                LazyField::Unavailable
            }
        }
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

    /// Iterate the transport headers without materializing them.
    pub fn headers(&self) -> LazyField<RawHeaders<'_>> {
        match RawHeaders::parse(&self.body, HEADERS_AT) {
            Ok(raw) => LazyField::Value(raw),
            Err(err) => {
                self.cache.record(err);
                LazyField::Unavailable
            }
        }
    }

    /// The first argument, UTF-8 validated. Absent when the body carries no
    /// args at all.
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

    /// Offset of the checksum slot: the end of the header list.
    fn csum_start(&self) -> Option<usize> {
        cached_offset(&self.cache.csum_start, || {
            match headers::skip(&self.body, HEADERS_AT) {
                Ok(end) => Some(end),
                Err(err) => {
                    self.cache.record(err);
                    None
                }
            }
        })
    }

    fn args_start(&self) -> Option<usize> {
        let csum_start = self.csum_start()?;
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
