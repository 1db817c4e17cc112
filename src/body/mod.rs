//! Structured codecs for call-frame bodies.
//!
//! A body is decoded into an owning value (strings and args copied out of
//! the source buffer) or encoded with a two-pass writer: callers size the
//! destination with `byte_length`, then `encode_into` writes the fields in
//! wire order. The flags byte is reserved up front and patched after the
//! args are written, because writing the args is what decides the fragment
//! bit.

mod request;
mod response;

pub use request::CallRequest;
pub use response::{CallResponse, ResponseCode};

use bytes::{Bytes, BytesMut};

use crate::{
    error::Result,
    wire::{put_arg2, BodyReader},
};

/// Flags bit 0: more continuation bodies follow in the logical call.
pub const FRAGMENT_FLAG: u8 = 0x01;

/// Consume the rest of the body as packed `arg2` entries.
///
/// The arg count is implicit; entries are read until the body is exhausted.
/// The last arg may be empty. A trailing partial entry underflows.
fn read_args(reader: &mut BodyReader<'_>) -> Result<Vec<Bytes>> {
    let mut args = Vec::new();
    while !reader.is_empty() {
        args.push(Bytes::copy_from_slice(reader.read_arg2()?));
    }
    Ok(args)
}

/// Append the packed args and return the flag bits the args writer claims
/// on the containing body: the fragment bit when more bodies follow.
fn write_args(dst: &mut BytesMut, args: &[Bytes], is_last: bool) -> Result<u8> {
    for arg in args {
        put_arg2(dst, arg)?;
    }
    Ok(if is_last { 0 } else { FRAGMENT_FLAG })
}

fn args_byte_length(args: &[Bytes]) -> usize { args.iter().map(|arg| 2 + arg.len()).sum() }
