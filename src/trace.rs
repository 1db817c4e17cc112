//! Fixed-layout tracing record carried by every call body.
//!
//! The record is always 25 bytes on the wire: three 64-bit identifiers
//! (span, parent, trace), each encoded as a high-then-low pair of big-endian
//! `u32` halves, followed by a single flags byte. The meaning of the flag
//! bits belongs to the tracing subsystem; this codec only moves them.

use bytes::{BufMut, BytesMut};

use crate::{error::Result, wire::BodyReader};

/// Distributed-tracing identifiers for one call.
///
/// A zero-filled record stands for "tracing unset"; the slot is always
/// present on the wire.
///
/// # Examples
///
/// ```
/// use callwire::trace::Tracing;
///
/// let tracing = Tracing::default();
/// assert_eq!(tracing.span_id, 0);
///
/// let mut dst = bytes::BytesMut::new();
/// tracing.write_into(&mut dst);
/// assert_eq!(dst.len(), Tracing::LEN);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Tracing {
    /// Identifier of the span this call belongs to.
    pub span_id: u64,
    /// Identifier of the parent span, zero at a trace root.
    pub parent_id: u64,
    /// Identifier shared by every span in the trace.
    pub trace_id: u64,
    /// Trace flag bits, forwarded verbatim.
    pub flags: u8,
}

impl Tracing {
    /// Encoded length of the record: three id pairs plus the flags byte.
    pub const LEN: usize = 25;

    /// Read a tracing record at the cursor position.
    ///
    /// Fails only on buffer underflow.
    pub fn read_from(reader: &mut BodyReader<'_>) -> Result<Self> {
        let span_id = read_u64_pair(reader)?;
        let parent_id = read_u64_pair(reader)?;
        let trace_id = read_u64_pair(reader)?;
        let flags = reader.read_u8()?;
        Ok(Self {
            span_id,
            parent_id,
            trace_id,
            flags,
        })
    }

    /// Append the 25-byte record to `dst`.
    pub fn write_into(&self, dst: &mut BytesMut) {
        dst.reserve(Self::LEN);
        put_u64_pair(dst, self.span_id);
        put_u64_pair(dst, self.parent_id);
        put_u64_pair(dst, self.trace_id);
        dst.put_u8(self.flags);
    }
}

/// Read a 64-bit id stored as high-then-low big-endian `u32` halves.
///
/// The byte sequence is identical to a big-endian `u64`; the pairing only
/// reflects how the format documents the field.
fn read_u64_pair(reader: &mut BodyReader<'_>) -> Result<u64> {
    let high = reader.read_u32()?;
    let low = reader.read_u32()?;
    Ok((u64::from(high) << 32) | u64::from(low))
}

/// Append a 64-bit id as its high-then-low `u32` halves.
///
/// Big-endian `u64` bytes already have that layout, so the halves are
/// written in one pass.
fn put_u64_pair(dst: &mut BytesMut, value: u64) { dst.put_slice(&value.to_be_bytes()); }

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
