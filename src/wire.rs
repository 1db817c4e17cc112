//! Primitive readers and writers for the call-body wire format.
//!
//! The format is position-dependent: fixed-width big-endian integers and two
//! variable-width byte-string encodings, `str1` (1-byte length prefix) and
//! `arg2` (2-byte big-endian length prefix). [`BodyReader`] is a borrowing
//! cursor over a received body; the `put_*` helpers append to a `BytesMut`
//! destination and enforce prefix-width limits.

use bytes::{BufMut, BytesMut};

use crate::{
    byte_order::{read_network_u16, read_network_u32, write_network_u16},
    error::{Result, WireError},
};

/// Largest byte length a `str1` field can carry.
pub const STR1_MAX: usize = u8::MAX as usize;

/// Largest byte length an `arg2` field can carry.
pub const ARG2_MAX: usize = u16::MAX as usize;

/// Borrowing cursor over the bytes of a call body.
///
/// Every read fails with [`WireError::BufferTooShort`] when the remaining
/// bytes cannot satisfy the requested width, leaving the cursor position
/// unchanged on failure.
///
/// # Examples
///
/// ```
/// use callwire::wire::BodyReader;
///
/// let mut reader = BodyReader::new(&[0x00, 0x2a, 0x03, b's', b'v', b'c']);
/// assert_eq!(reader.read_u16().unwrap(), 42);
/// assert_eq!(reader.read_str1_bytes().unwrap(), b"svc");
/// assert!(reader.is_empty());
/// ```
#[derive(Debug)]
pub struct BodyReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    /// Create a cursor positioned at the start of `buf`.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self { Self { buf, pos: 0 } }

    /// Create a cursor positioned at `pos`, for lazy reads that resume from
    /// a previously computed offset.
    ///
    /// A `pos` past the end of `buf` yields a cursor whose reads fail with
    /// [`WireError::BufferTooShort`] rather than panicking.
    #[must_use]
    pub const fn starting_at(buf: &'a [u8], pos: usize) -> Self { Self { buf, pos } }

    /// Current byte offset from the start of the body.
    #[must_use]
    pub const fn pos(&self) -> usize { self.pos }

    /// Bytes left to consume.
    #[must_use]
    pub const fn remaining(&self) -> usize { self.buf.len().saturating_sub(self.pos) }

    /// Whether the cursor has consumed the whole body.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.remaining() == 0 }

    fn take(&mut self, need: usize) -> Result<&'a [u8]> {
        let have = self.remaining();
        if have < need {
            return Err(WireError::BufferTooShort {
                offset: self.pos,
                need,
                have,
            });
        }
        if need == 0 {
            return Ok(&[]);
        }
        let slice = &self.buf[self.pos..self.pos + need];
        self.pos += need;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.take(1)?;
        Ok(bytes[0])
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(read_network_u16([bytes[0], bytes[1]]))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(read_network_u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a `str1` field and return its raw payload bytes.
    pub fn read_str1_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()? as usize;
        self.take(len)
    }

    /// Read a `str1` field and validate it as UTF-8.
    ///
    /// `field` names the wire field for error reporting.
    pub fn read_str1(&mut self, field: &'static str) -> Result<&'a str> {
        let payload_at = self.pos + 1;
        let bytes = self.read_str1_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8 {
            offset: payload_at,
            field,
        })
    }

    /// Read an `arg2` field and return its payload bytes.
    pub fn read_arg2(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u16()? as usize;
        self.take(len)
    }

    /// Advance the cursor by `n` bytes without interpreting them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n)?;
        Ok(())
    }

    /// Fail with [`WireError::TrailingBytes`] unless the body is exhausted.
    pub fn expect_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(WireError::TrailingBytes {
                offset: self.pos,
                remaining: self.remaining(),
            })
        }
    }
}

/// Append a `str1` field to `dst`.
///
/// # Errors
///
/// Returns [`WireError::LengthOverflow`] when `value` exceeds [`STR1_MAX`].
pub fn put_str1(dst: &mut BytesMut, value: &[u8]) -> Result<()> {
    let len = u8::try_from(value.len()).map_err(|_| WireError::LengthOverflow {
        offset: dst.len(),
        len: value.len(),
        max: STR1_MAX,
    })?;
    dst.reserve(1 + value.len());
    dst.put_u8(len);
    dst.put_slice(value);
    Ok(())
}

/// Append an `arg2` field to `dst`.
///
/// # Errors
///
/// Returns [`WireError::LengthOverflow`] when `value` exceeds [`ARG2_MAX`].
pub fn put_arg2(dst: &mut BytesMut, value: &[u8]) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| WireError::LengthOverflow {
        offset: dst.len(),
        len: value.len(),
        max: ARG2_MAX,
    })?;
    dst.reserve(2 + value.len());
    dst.put_slice(&write_network_u16(len));
    dst.put_slice(value);
    Ok(())
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
