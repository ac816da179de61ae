//! The 16-byte frame footer.
//!
//! ```text
//! ┌──────────────────────┬───────────────────────────┬──────────────┐
//! │ payload (L-16 bytes) │ discriminant (8B LE)      │ reserved (8B)│
//! │ opaque               │ low 4 bytes significant   │ zero         │
//! └──────────────────────┴───────────────────────────┴──────────────┘
//! ```
//!
//! This layout is shared with device firmware byte for byte. Group member
//! frames use the same footer as top-level frames.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// Footer size in bytes.
pub const FOOTER_SIZE: usize = 16;

/// A frame split into its discriminant and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameView {
    /// Raw message-type discriminant from the footer.
    pub discriminant: u32,
    /// Everything before the footer. Shares the frame's buffer.
    pub payload: Bytes,
}

/// Split a frame into discriminant and payload.
///
/// Fails with [`FrameError::MalformedFrame`] if the frame cannot hold a footer.
pub fn decode_footer(frame: &Frame) -> Result<FrameView> {
    let len = frame.payload.len();
    let start = len.checked_sub(FOOTER_SIZE).ok_or(FrameError::MalformedFrame {
        len,
        min: FOOTER_SIZE,
    })?;

    let mut raw = [0u8; 4];
    raw.copy_from_slice(&frame.payload[start..start + 4]);

    Ok(FrameView {
        discriminant: u32::from_le_bytes(raw),
        payload: frame.payload.slice(..start),
    })
}

/// Append the footer for `discriminant` to `payload`.
pub fn encode_footer(discriminant: u32, payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(payload.len() + FOOTER_SIZE);
    out.put_slice(payload);
    out.put_u64_le(u64::from(discriminant));
    out.put_u64_le(0);
    out.freeze()
}
