//! Structured codec for CallResponse bodies.

use bytes::{BufMut, Bytes, BytesMut};

use super::{args_byte_length, read_args, write_args, FRAGMENT_FLAG};
use crate::{
    checksum::Checksum,
    error::Result,
    headers::Headers,
    trace::Tracing,
    wire::BodyReader,
};

/// Outcome code carried by a response body.
///
/// Unknown codes are not an error; they pass through decode and re-encode
/// unchanged so intermediaries stay forward-compatible.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResponseCode {
    /// The call completed normally.
    Ok,
    /// The call failed; the args carry the application error.
    Error,
    /// A code this crate does not know about, forwarded verbatim.
    Other(u8),
}

impl ResponseCode {
    /// Decode a wire code byte.
    #[must_use]
    pub const fn from_wire(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::Error,
            other => Self::Other(other),
        }
    }

    /// The on-wire code byte.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::Error => 0x01,
            Self::Other(code) => code,
        }
    }

    /// Whether this code reports success.
    #[must_use]
    pub const fn is_ok(self) -> bool { matches!(self, Self::Ok) }
}

/// A fully materialized CallResponse body.
///
/// Wire layout:
///
/// ```text
/// flags:1 code:1 tracing:25 nh:1 (hk~1 hv~1){nh} csumtype:1 (csum:4){0|1} (arg~2)*
/// ```
///
/// The shape mirrors [`CallRequest`](super::CallRequest) without the ttl
/// and service fields, plus the response code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallResponse {
    /// Flag bits; bit 0 is the fragment bit, the rest pass through.
    pub flags: u8,
    /// Outcome code.
    pub code: ResponseCode,
    /// Tracing record, zero-filled when unset.
    pub tracing: Tracing,
    /// Transport headers in wire order.
    pub headers: Headers,
    /// Checksum slot covering the args.
    pub checksum: Checksum,
    /// Call results; the count is implicit on the wire.
    pub args: Vec<Bytes>,
}

impl CallResponse {
    /// Frame type code assigned to CallResponse bodies.
    pub const FRAME_TYPE: u8 = 0x04;

    /// Total encoded length of this body in bytes.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        1 + 1
            + Tracing::LEN
            + self.headers.byte_length()
            + self.checksum.byte_length()
            + args_byte_length(&self.args)
    }

    /// Decode a complete body from `body`.
    ///
    /// # Errors
    ///
    /// Surfaces the first failure with its byte offset.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut reader = BodyReader::new(body);
        let flags = reader.read_u8()?;
        let code = ResponseCode::from_wire(reader.read_u8()?);
        let tracing = Tracing::read_from(&mut reader)?;
        let headers = Headers::read_from(&mut reader)?;
        let checksum = Checksum::read_from(&mut reader)?;
        let args = read_args(&mut reader)?;
        reader.expect_end()?;
        Ok(Self {
            flags,
            code,
            tracing,
            headers,
            checksum,
            args,
        })
    }

    /// Encode the body, appending to `dst`.
    ///
    /// `is_last` states whether this body completes the logical call; see
    /// [`CallRequest::encode_into`](super::CallRequest::encode_into) for
    /// the flags-byte write order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::WireError::LengthOverflow`] when a header or
    /// arg exceeds its length prefix. `dst` is restored to its original
    /// length on failure.
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
        let flags_at = dst.len();
        dst.reserve(self.byte_length());
        dst.put_u8(0);
        dst.put_u8(self.code.to_wire());
        self.tracing.write_into(dst);
        self.headers.write_into(dst)?;
        self.checksum.write_into(dst);
        let fragment = write_args(dst, &self.args, is_last)?;
        dst[flags_at] = (self.flags & !FRAGMENT_FLAG) | fragment;
        Ok(())
    }
}
