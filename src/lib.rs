#![doc(html_root_url = "https://docs.rs/callwire/latest")]
//! Wire codec for the call frames of a binary RPC protocol.
//!
//! A call frame body is a dense, position-dependent binary record: fixed
//! big-endian integers, length-prefixed strings, a variable header list, an
//! optional checksum digest, and a packed run of arguments. This crate
//! provides two ways in:
//!
//! - **Structured codecs** ([`body::CallRequest`], [`body::CallResponse`])
//!   materialize a whole body for the slower control paths: two-pass encode
//!   (size, then write) and full decode with validation.
//! - **Lazy readers** ([`frame::RequestFrame`], [`frame::ResponseFrame`])
//!   extract single fields straight from a received frame buffer for the
//!   per-frame routing hot path, memoizing computed offsets in a per-frame
//!   [`frame::OffsetCache`] so repeated access is O(1).
//!
//! The [`ratelimit`] module is the admission collaborator fed by decoded
//! `(caller, service)` pairs. Framing, transport, and the checksum digest
//! algorithms live outside this crate.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use callwire::{
//!     body::CallRequest,
//!     frame::{LazyField, RequestFrame},
//!     headers::Headers,
//! };
//!
//! let mut headers = Headers::new();
//! headers.push("cn", "gateway");
//!
//! let request = CallRequest {
//!     flags: 0,
//!     ttl: 250,
//!     tracing: callwire::trace::Tracing::default(),
//!     service: "orders".into(),
//!     headers,
//!     checksum: callwire::checksum::Checksum::default(),
//!     args: vec![Bytes::from_static(b"get"), Bytes::new(), Bytes::new()],
//! };
//!
//! // Slow path: full round-trip.
//! let wire = request.encode(true)?;
//! assert_eq!(CallRequest::decode(&wire)?, request);
//!
//! // Hot path: pull the routing fields without decoding the body.
//! let frame = RequestFrame::new(wire);
//! assert_eq!(frame.service(), LazyField::Value("orders"));
//! assert_eq!(frame.caller_name(), LazyField::Value("gateway"));
//! # Ok::<(), callwire::WireError>(())
//! ```

pub mod body;
pub mod byte_order;
pub mod checksum;
pub mod error;
pub mod frame;
pub mod headers;
pub mod ratelimit;
pub mod trace;
pub mod wire;

pub use body::{CallRequest, CallResponse, ResponseCode, FRAGMENT_FLAG};
pub use error::{Result, WireError};
pub use frame::{LazyField, OffsetCache, RequestFrame, ResponseFrame};
pub use headers::Headers;
