//! Checksum tag taxonomy and wire codec.
//!
//! A call body carries a one-byte checksum type tag, followed by a
//! fixed-width digest when the type is not [`ChecksumType::None`]. The
//! digest width is a pure function of the tag. The digest *algorithms*
//! live outside this crate; verification plugs in an [`ArgsDigest`]
//! implementation supplied by the consumer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::{Result, WireError},
    wire::BodyReader,
};

/// Closed enumeration of checksum type tags.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ChecksumType {
    /// No digest follows the tag.
    #[default]
    None,
    /// CRC-32 over the canonical argument concatenation.
    Crc32,
    /// Farmhash fingerprint32.
    Farmhash,
    /// CRC-32C (Castagnoli).
    Crc32c,
}

impl ChecksumType {
    /// Decode a tag byte read at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidChecksumType`] for tags outside the
    /// taxonomy.
    pub fn from_tag(tag: u8, offset: usize) -> Result<Self> {
        match tag {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Crc32),
            0x02 => Ok(Self::Farmhash),
            0x03 => Ok(Self::Crc32c),
            _ => Err(WireError::InvalidChecksumType { offset, tag }),
        }
    }

    /// The on-wire tag byte.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Crc32 => 0x01,
            Self::Farmhash => 0x02,
            Self::Crc32c => 0x03,
        }
    }

    /// Width in bytes of the digest that follows the tag.
    #[must_use]
    pub const fn digest_width(self) -> usize {
        match self {
            Self::None => 0,
            Self::Crc32 | Self::Farmhash | Self::Crc32c => 4,
        }
    }
}

/// Checksum slot of a call body: a type tag and, for non-`None` types, the
/// digest carried on the wire.
///
/// # Examples
///
/// ```
/// use callwire::checksum::{Checksum, ChecksumType};
///
/// let checksum = Checksum::new(ChecksumType::Crc32, Some(0xdead_beef));
/// assert_eq!(checksum.byte_length(), 5);
/// assert_eq!(Checksum::default().byte_length(), 1);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum {
    kind: ChecksumType,
    digest: Option<u32>,
}

impl Checksum {
    /// Assemble a checksum slot.
    ///
    /// The digest is ignored for [`ChecksumType::None`]; the type alone
    /// decides whether one is written.
    #[must_use]
    pub const fn new(kind: ChecksumType, digest: Option<u32>) -> Self {
        match kind {
            ChecksumType::None => Self { kind, digest: None },
            _ => Self { kind, digest },
        }
    }

    /// The checksum type tag.
    #[must_use]
    pub const fn kind(&self) -> ChecksumType { self.kind }

    /// The digest carried on the wire, if the type has one.
    #[must_use]
    pub const fn digest(&self) -> Option<u32> { self.digest }

    /// Encoded length: the tag plus the type's digest width.
    #[must_use]
    pub const fn byte_length(&self) -> usize { 1 + self.kind.digest_width() }

    /// Read the tag and digest at the cursor position.
    pub fn read_from(reader: &mut BodyReader<'_>) -> Result<Self> {
        let tag_at = reader.pos();
        let kind = ChecksumType::from_tag(reader.read_u8()?, tag_at)?;
        let digest = match kind.digest_width() {
            0 => None,
            _ => Some(reader.read_u32()?),
        };
        Ok(Self { kind, digest })
    }

    /// Append the tag and digest to `dst`.
    ///
    /// A missing digest for a digest-bearing type encodes as zero; the
    /// consumer computes real digests through [`ArgsDigest`].
    pub fn write_into(&self, dst: &mut BytesMut) {
        dst.put_u8(self.kind.tag());
        if self.kind.digest_width() > 0 {
            dst.put_u32(self.digest.unwrap_or(0));
        }
    }

    /// Recompute the digest over `args` with `hasher` and compare it
    /// against the digest carried on the wire.
    ///
    /// The canonical input is the concatenation of the argument payloads in
    /// order, without length prefixes. [`ChecksumType::None`] always
    /// verifies.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::ChecksumMismatch`] when the digests differ.
    pub fn verify<D: ArgsDigest>(&self, args: &[Bytes], mut hasher: D) -> Result<()> {
        let Some(expected) = self.digest else {
            return Ok(());
        };
        for arg in args {
            hasher.update(arg);
        }
        let actual = hasher.finish();
        if actual == expected {
            Ok(())
        } else {
            Err(WireError::ChecksumMismatch { expected, actual })
        }
    }
}

/// Skip a checksum slot starting at `start`, returning the end offset.
///
/// Only the tag byte is inspected; the digest is skipped by width.
pub fn skip(buf: &[u8], start: usize) -> Result<usize> {
    let mut reader = BodyReader::starting_at(buf, start);
    let kind = ChecksumType::from_tag(reader.read_u8()?, start)?;
    reader.skip(kind.digest_width())?;
    Ok(reader.pos())
}

/// Digest computation over the canonical argument concatenation.
///
/// Implemented by the consumer for whichever algorithms it links; the codec
/// owns only the tag taxonomy and the compare step.
pub trait ArgsDigest {
    /// Feed one chunk of the canonical input.
    fn update(&mut self, chunk: &[u8]);

    /// Produce the 32-bit digest over everything fed so far.
    fn finish(&self) -> u32;
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
