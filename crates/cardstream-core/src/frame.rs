//! Server-Sent Events framing.
//!
//! Every item becomes exactly one frame: the literal `data:`, the JSON payload,
//! and a blank line. No `id:` or `event:` fields are written, so clients see
//! each frame as a plain `message` event.

use crate::common::error::{Error, Result};
use bytes::Bytes;
use serde::Serialize;

pub const DATA_PREFIX: &[u8] = b"data:";
pub const FRAME_TERMINATOR: &[u8] = b"\n\n";

/// Response headers an event stream is served with.
pub const EVENT_STREAM_HEADERS: [(&str, &str); 3] = [
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
];

/// Serializes `item` into a single `data:` frame.
///
/// # Errors
///
/// Returns [`Error::Encode`] if `item` cannot be serialized to JSON.
pub fn encode_frame<T: Serialize>(item: &T) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(96);
    buf.extend_from_slice(DATA_PREFIX);
    serde_json::to_writer(&mut buf, item).map_err(Error::Encode)?;
    buf.extend_from_slice(FRAME_TERMINATOR);
    Ok(Bytes::from(buf))
}
