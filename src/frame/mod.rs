//! Lazy readers over received call frames.
//!
//! The hot path makes routing and admission decisions per frame and only
//! needs a handful of fields: the service, the caller name, an optional
//! routing delegate, the first argument, and the ttl. [`RequestFrame`] and
//! [`ResponseFrame`] pull those fields straight out of the frame buffer
//! without materializing the body, memoizing computed byte offsets and
//! extracted strings in a per-frame [`OffsetCache`] so every repeated
//! access is O(1).
//!
//! Lazy accessors never return errors. A field that cannot be read yields
//! [`LazyField::Unavailable`] and the reason is parked on the cache
//! ([`OffsetCache::last_error`]); a field that is validly missing (no `cn`
//! header, say) yields [`LazyField::Absent`]. The consumer decides whether
//! either outcome is fatal.
//!
//! The cache uses interior mutability (`OnceCell` slots that fill once and
//! never change) because frames are processed by exactly one worker at a
//! time; the readers are deliberately not `Sync`.

mod request;
mod response;

pub use request::RequestFrame;
pub use response::ResponseFrame;

use std::cell::{OnceCell, RefCell};

use log::debug;

use crate::{
    error::{Result, WireError},
    trace::Tracing,
    wire::BodyReader,
};

/// Outcome of a lazy field read.
///
/// # Examples
///
/// ```
/// use callwire::frame::LazyField;
///
/// let field = LazyField::Value("orders");
/// assert_eq!(field.value(), Some("orders"));
/// assert!(!LazyField::<&str>::Absent.is_unavailable());
/// assert!(LazyField::<&str>::Unavailable.is_unavailable());
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LazyField<T> {
    /// The field was read successfully.
    Value(T),
    /// The field is validly missing from the frame.
    Absent,
    /// The field could not be read; the cache records why.
    Unavailable,
}

impl<T> LazyField<T> {
    /// The extracted value, if one was read.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Unavailable => None,
        }
    }

    /// Apply `f` to the extracted value, preserving the sentinels.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LazyField<U> {
        match self {
            Self::Value(value) => LazyField::Value(f(value)),
            Self::Absent => LazyField::Absent,
            Self::Unavailable => LazyField::Unavailable,
        }
    }

    /// Whether a value was read.
    pub fn is_value(&self) -> bool { matches!(self, Self::Value(_)) }

    /// Whether the field is validly missing.
    pub fn is_absent(&self) -> bool { matches!(self, Self::Absent) }

    /// Whether the read gave up.
    pub fn is_unavailable(&self) -> bool { matches!(self, Self::Unavailable) }
}

/// Final state of a value slot in the cache.
#[derive(Clone, Debug)]
enum Slot<T> {
    Ready(T),
    Absent,
    Failed,
}

impl<T> Slot<T> {
    fn as_lazy(&self) -> LazyField<&T> {
        match self {
            Self::Ready(value) => LazyField::Value(value),
            Self::Absent => LazyField::Absent,
            Self::Failed => LazyField::Unavailable,
        }
    }
}

/// Per-frame scratch pad for lazily computed offsets and strings.
///
/// Slots fill monotonically: unset means "not yet computed", and a set slot
/// is never rewritten. Offset slots are only committed by a scan that
/// completed, so a failed scan leaves them unset rather than half-filled.
/// `last_error` is the one rewritable cell, holding the most recent reason
/// a lazy read gave up.
#[derive(Debug, Default)]
pub struct OffsetCache {
    ttl: OnceCell<Slot<u32>>,
    tracing: OnceCell<Slot<Tracing>>,
    service: OnceCell<Slot<Box<str>>>,
    caller_name: OnceCell<Slot<Box<str>>>,
    routing_delegate: OnceCell<Slot<Box<str>>>,
    arg1: OnceCell<Slot<Box<str>>>,
    header_start: OnceCell<usize>,
    csum_start: OnceCell<usize>,
    cn_value: OnceCell<Option<usize>>,
    rd_value: OnceCell<Option<usize>>,
    last_error: RefCell<Option<WireError>>,
}

impl OffsetCache {
    /// Offset of the header list, when a lazy read has computed it.
    #[must_use]
    pub fn header_start_offset(&self) -> Option<usize> { self.header_start.get().copied() }

    /// Offset of the checksum slot, when the header scan has completed.
    #[must_use]
    pub fn checksum_offset(&self) -> Option<usize> { self.csum_start.get().copied() }

    /// Offset of the first `cn` header value: `None` before any scan,
    /// `Some(None)` once a scan proved the header absent.
    #[must_use]
    pub fn caller_name_offset(&self) -> Option<Option<usize>> { self.cn_value.get().copied() }

    /// Offset of the first `rd` header value, with the same states as
    /// [`Self::caller_name_offset`].
    #[must_use]
    pub fn routing_delegate_offset(&self) -> Option<Option<usize>> { self.rd_value.get().copied() }

    /// The most recent reason a lazy read gave up, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<WireError> { self.last_error.borrow().clone() }

    fn record(&self, err: WireError) {
        debug!("lazy read gave up: {err}");
        *self.last_error.borrow_mut() = Some(err);
    }
}

/// Fetch through a monotone offset slot.
///
/// A successful computation is committed and returned; a failed one leaves
/// the slot unset so nothing partial is ever cached.
fn cached_offset<T: Copy>(cell: &OnceCell<T>, compute: impl FnOnce() -> Option<T>) -> Option<T> {
    if let Some(value) = cell.get() {
        return Some(*value);
    }
    let value = compute()?;
    let _ = cell.set(value);
    Some(value)
}

/// Read the first arg at `args_start`.
///
/// Returns `Ok(None)` when the args region is empty, which a body with zero
/// args legitimately is.
fn read_first_arg(buf: &[u8], args_start: usize) -> Result<Option<&[u8]>> {
    let mut reader = BodyReader::starting_at(buf, args_start);
    if reader.is_empty() {
        return Ok(None);
    }
    reader.read_arg2().map(Some)
}

/// UTF-8-validate a lazily extracted field into its cache slot, recording
/// the failure on `cache` when validation fails.
fn utf8_slot(cache: &OffsetCache, bytes: &[u8], at: usize, field: &'static str) -> Slot<Box<str>> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Slot::Ready(Box::from(text)),
        Err(_) => {
            cache.record(WireError::InvalidUtf8 { offset: at, field });
            Slot::Failed
        }
    }
}
