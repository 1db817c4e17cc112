//! Structured codec for CallRequest bodies.

use bytes::{BufMut, Bytes, BytesMut};

use super::{args_byte_length, read_args, write_args, FRAGMENT_FLAG};
use crate::{
    checksum::Checksum,
    error::{Result, WireError},
    headers::Headers,
    trace::Tracing,
    wire::{put_str1, BodyReader},
};

/// A fully materialized CallRequest body.
///
/// Wire layout:
///
/// ```text
/// flags:1 ttl:4 tracing:25 service~1 nh:1 (hk~1 hv~1){nh} csumtype:1 (csum:4){0|1} (arg~2)*
/// ```
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use callwire::body::CallRequest;
///
/// let request = CallRequest {
///     flags: 0,
///     ttl: 1000,
///     tracing: callwire::trace::Tracing::default(),
///     service: "orders".into(),
///     headers: callwire::headers::Headers::new(),
///     checksum: callwire::checksum::Checksum::default(),
///     args: vec![Bytes::from_static(b"get"), Bytes::new(), Bytes::new()],
/// };
///
/// let wire = request.encode(true).unwrap();
/// assert_eq!(wire.len(), request.byte_length());
/// assert_eq!(CallRequest::decode(&wire).unwrap(), request);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallRequest {
    /// Flag bits; bit 0 is the fragment bit, the rest pass through.
    pub flags: u8,
    /// Time-to-live in milliseconds. Must be positive.
    pub ttl: u32,
    /// Tracing record, zero-filled when unset.
    pub tracing: Tracing,
    /// Service to route the call to.
    pub service: String,
    /// Transport headers in wire order.
    pub headers: Headers,
    /// Checksum slot covering the args.
    pub checksum: Checksum,
    /// Call arguments; the count is implicit on the wire.
    pub args: Vec<Bytes>,
}

impl CallRequest {
    /// Frame type code assigned to CallRequest bodies.
    pub const FRAME_TYPE: u8 = 0x03;

    /// Total encoded length of this body in bytes.
    ///
    /// This is the capacity handshake with the framing layer: compute the
    /// length first, then encode.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        1 + 4
            + Tracing::LEN
            + 1
            + self.service.len()
            + self.headers.byte_length()
            + self.checksum.byte_length()
            + args_byte_length(&self.args)
    }

    /// Decode a complete body from `body`.
    ///
    /// # Errors
    ///
    /// Surfaces the first failure with its byte offset: underflow, a zero
    /// ttl, invalid UTF-8 in the service or a header, or an unknown
    /// checksum tag.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut reader = BodyReader::new(body);
        let flags = reader.read_u8()?;
        let ttl_at = reader.pos();
        let ttl = reader.read_u32()?;
        if ttl == 0 {
            return Err(WireError::InvalidTtl { offset: ttl_at });
        }
        let tracing = Tracing::read_from(&mut reader)?;
        let service = reader.read_str1("service")?.to_owned();
        let headers = Headers::read_from(&mut reader)?;
        let checksum = Checksum::read_from(&mut reader)?;
        let args = read_args(&mut reader)?;
        reader.expect_end()?;
        Ok(Self {
            flags,
            ttl,
            tracing,
            service,
            headers,
            checksum,
            args,
        })
    }

    /// Encode the body, appending to `dst`.
    ///
    /// `is_last` states whether this body completes the logical call; the
    /// fragment bit is set on the wire exactly when it does not. The flags
    /// byte is written last, in place, once the args have decided that bit.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidTtl`] for a zero ttl and
    /// [`WireError::LengthOverflow`] when the service, a header, or an arg
    /// exceeds its length prefix. `dst` is restored to its original length
    /// on failure.
    pub fn encode_into(&self, dst: &mut BytesMut, is_last: bool) -> Result<()> {
        let start = dst.len();
        self.write_fields(dst, is_last).inspect_err(|_| dst.truncate(start))
    }

    /// Encode the body into a fresh buffer.
    pub fn encode(&self, is_last: bool) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.byte_length());
        self.encode_into(&mut dst, is_last)?;
        Ok(dst.freeze())
    }

    fn write_fields(&self, dst: &mut BytesMut, is_last: bool) -> Result<()> {
        if self.ttl == 0 {
            return Err(WireError::InvalidTtl { offset: dst.len() + 1 });
        }
        let flags_at = dst.len();
        dst.reserve(self.byte_length());
        dst.put_u8(0);
        dst.put_u32(self.ttl);
        self.tracing.write_into(dst);
        put_str1(dst, self.service.as_bytes())?;
        self.headers.write_into(dst)?;
        self.checksum.write_into(dst);
        let fragment = write_args(dst, &self.args, is_last)?;
        dst[flags_at] = (self.flags & !FRAGMENT_FLAG) | fragment;
        Ok(())
    }
}
