//! Error taxonomy for the call-frame codec.
//!
//! Every structured read or write surfaces the first failure together with
//! the byte offset (relative to the start of the call body) where it
//! occurred. Lazy accessors never return these errors directly; they park
//! the reason on the frame's offset cache instead and hand the caller an
//! `Unavailable` sentinel.

use thiserror::Error;

/// Failures produced while encoding or decoding a call body.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before a fixed or length-prefixed field was complete.
    #[error("buffer too short at offset {offset}: need {need} bytes, have {have}")]
    BufferTooShort {
        /// Offset of the field that could not be read.
        offset: usize,
        /// Bytes the field required.
        need: usize,
        /// Bytes that were actually available.
        have: usize,
    },

    /// A request carried a zero time-to-live.
    #[error("ttl must be positive at offset {offset}")]
    InvalidTtl {
        /// Offset of the ttl field.
        offset: usize,
    },

    /// A value does not fit the width of its length prefix.
    #[error("length overflow at offset {offset}: {len} exceeds prefix maximum {max}")]
    LengthOverflow {
        /// Offset where the oversized value was being written or counted.
        offset: usize,
        /// Actual length of the value.
        len: usize,
        /// Largest length the prefix can encode.
        max: usize,
    },

    /// The checksum tag byte is not part of the known taxonomy.
    #[error("unknown checksum type {tag:#04x} at offset {offset}")]
    InvalidChecksumType {
        /// Offset of the tag byte.
        offset: usize,
        /// Tag value that was rejected.
        tag: u8,
    },

    /// A field that must be UTF-8 contained an invalid byte sequence.
    #[error("invalid UTF-8 in {field} at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string payload.
        offset: usize,
        /// Name of the wire field that failed validation.
        field: &'static str,
    },

    /// A structured read finished with unconsumed bytes remaining.
    #[error("{remaining} trailing bytes after offset {offset}")]
    TrailingBytes {
        /// Offset at which the reader stopped.
        offset: usize,
        /// Bytes left unconsumed.
        remaining: usize,
    },

    /// A recomputed digest did not match the one carried on the wire.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Digest carried in the frame.
        expected: u32,
        /// Digest recomputed over the arguments.
        actual: u32,
    },
}

impl WireError {
    /// Returns the error category as a string for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BufferTooShort { .. } => "buffer_too_short",
            Self::InvalidTtl { .. } => "invalid_ttl",
            Self::LengthOverflow { .. } => "length_overflow",
            Self::InvalidChecksumType { .. } => "invalid_checksum_type",
            Self::InvalidUtf8 { .. } => "invalid_utf8",
            Self::TrailingBytes { .. } => "trailing_bytes",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
        }
    }
}

/// Canonical result alias used by the codec's fallible operations.
pub type Result<T> = std::result::Result<T, WireError>;
