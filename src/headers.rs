//! Transport header list codec.
//!
//! Headers are an ordered list of `str1` key/value pairs prefixed by a
//! one-byte count. Wire order is preserved on round-trip and duplicate keys
//! are legal; lookups return the first occurrence. Besides the owning
//! [`Headers`] representation, this module provides the lazy primitives the
//! hot path relies on: skipping the list without allocating, iterating
//! entries straight out of a frame buffer, and a single-pass scan that
//! records the value offsets of well-known two-byte keys.

use bytes::{BufMut, BytesMut};

use crate::{
    byte_order::read_network_u16,
    error::{Result, WireError},
    wire::{put_str1, BodyReader},
};

/// Transport header key carrying the calling service's name.
pub const CALLER_NAME_KEY: [u8; 2] = *b"cn";

/// Transport header key overriding the service to route to.
pub const ROUTING_DELEGATE_KEY: [u8; 2] = *b"rd";

/// Largest number of entries the one-byte count can carry.
pub const HEADER_COUNT_MAX: usize = u8::MAX as usize;

/// Build the probe constant for a two-byte header key.
///
/// The fast-path scan compares candidate keys as big-endian `u16` values,
/// so probes are prepared once with this helper.
///
/// # Examples
///
/// ```
/// use callwire::headers::short_key;
///
/// assert_eq!(short_key(*b"cn"), 0x636e);
/// ```
#[must_use]
pub const fn short_key(key: [u8; 2]) -> u16 { u16::from_be_bytes(key) }

/// Ordered, duplicate-tolerant string headers of one call body.
///
/// # Examples
///
/// ```
/// use callwire::headers::Headers;
///
/// let mut headers = Headers::new();
/// headers.push("cn", "gateway");
/// headers.push("cn", "shadowed");
/// assert_eq!(headers.get("cn"), Some("gateway"));
/// assert_eq!(headers.len(), 2);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub const fn new() -> Self { Self { entries: Vec::new() } }

    /// Append an entry, preserving insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Value of the first entry with `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Encoded length: the count byte plus each entry's prefixed lengths.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        1 + self
            .entries
            .iter()
            .map(|(k, v)| 2 + k.len() + v.len())
            .sum::<usize>()
    }

    /// Read a full header list at the cursor position.
    ///
    /// Keys and values are UTF-8 validated and copied out of the buffer.
    pub fn read_from(reader: &mut BodyReader<'_>) -> Result<Self> {
        let count = reader.read_u8()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let key = reader.read_str1("header key")?.to_owned();
            let value = reader.read_str1("header value")?.to_owned();
            entries.push((key, value));
        }
        Ok(Self { entries })
    }

    /// Append the encoded list to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::LengthOverflow`] when the entry count exceeds
    /// [`HEADER_COUNT_MAX`] or any key or value exceeds the `str1` width.
    pub fn write_into(&self, dst: &mut BytesMut) -> Result<()> {
        let count = u8::try_from(self.entries.len()).map_err(|_| WireError::LengthOverflow {
            offset: dst.len(),
            len: self.entries.len(),
            max: HEADER_COUNT_MAX,
        })?;
        dst.put_u8(count);
        for (key, value) in &self.entries {
            put_str1(dst, key.as_bytes())?;
            put_str1(dst, value.as_bytes())?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Walk a header list starting at `start` and return the end offset.
///
/// Nothing is allocated or validated beyond entry boundaries; this is the
/// skip used when a lazy accessor only needs to know where headers end.
pub fn skip(buf: &[u8], start: usize) -> Result<usize> {
    let mut reader = BodyReader::starting_at(buf, start);
    let count = reader.read_u8()?;
    for _ in 0..count {
        reader.read_str1_bytes()?;
        reader.read_str1_bytes()?;
    }
    Ok(reader.pos())
}

/// Iterator over raw header entries in a frame buffer.
///
/// Yields `(key, value)` byte-slice pairs in wire order without copying.
/// The first malformed entry is yielded as an error and iteration stops.
#[derive(Debug)]
pub struct RawHeaders<'a> {
    reader: BodyReader<'a>,
    remaining: u8,
}

impl<'a> RawHeaders<'a> {
    /// Begin iterating the header list that starts at `start`.
    ///
    /// # Errors
    ///
    /// Fails when the count byte itself is missing.
    pub fn parse(buf: &'a [u8], start: usize) -> Result<Self> {
        let mut reader = BodyReader::starting_at(buf, start);
        let remaining = reader.read_u8()?;
        Ok(Self { reader, remaining })
    }

    /// Entries not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> usize { usize::from(self.remaining) }
}

impl<'a> Iterator for RawHeaders<'a> {
    type Item = Result<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let key = match self.reader.read_str1_bytes() {
            Ok(key) => key,
            Err(err) => {
                self.remaining = 0;
                return Some(Err(err));
            }
        };
        match self.reader.read_str1_bytes() {
            Ok(value) => Some(Ok((key, value))),
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }
}

/// Result of a fast-path scan over a header list.
///
/// `hits[i]` holds the offset of the value `str1` belonging to the first
/// occurrence of `probes[i]`, or `None` when the key is absent. `end` is the
/// offset of the first byte after the list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShortKeyScan<const N: usize> {
    /// Offset just past the header list.
    pub end: usize,
    /// Per-probe value offsets, first occurrence wins.
    pub hits: [Option<usize>; N],
}

/// Scan the header list at `start` for two-byte keys in one pass.
///
/// Candidate keys are compared as big-endian `u16` values against `probes`
/// (see [`short_key`]); keys of any other length are skipped at no cost.
/// The scan either completes and reports every probe plus the end offset,
/// or fails without partial results.
pub fn scan_short_keys<const N: usize>(
    buf: &[u8],
    start: usize,
    probes: [u16; N],
) -> Result<ShortKeyScan<N>> {
    let mut reader = BodyReader::starting_at(buf, start);
    let mut hits = [None; N];
    let count = reader.read_u8()?;
    for _ in 0..count {
        let key = reader.read_str1_bytes()?;
        if key.len() == 2 {
            let candidate = read_network_u16([key[0], key[1]]);
            let value_at = reader.pos();
            for (probe, hit) in probes.iter().zip(hits.iter_mut()) {
                if *probe == candidate && hit.is_none() {
                    *hit = Some(value_at);
                }
            }
        }
        reader.read_str1_bytes()?;
    }
    Ok(ShortKeyScan {
        end: reader.pos(),
        hits,
    })
}

#[cfg(test)]
#[path = "headers_tests.rs"]
mod tests;
