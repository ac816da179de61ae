use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Packet header: magic (2) + length (4) + stream (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Magic bytes: "XL" (0x58 0x4C).
pub const MAGIC: [u8; 2] = [0x58, 0x4C];

/// Default maximum payload size: 64 MiB (a full-resolution RAW16 frame fits).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Stream id used when a link carries a single stream.
pub const DEFAULT_STREAM: u16 = 0;

/// One length-delimited packet read from a device link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The link stream this frame arrived on.
    pub stream: u16,
    /// Frame bytes, footer included.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(stream: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            stream,
            payload: payload.into(),
        }
    }

    /// Frame length in bytes (footer included, link header excluded).
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if the frame carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Size of this frame on the link (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a packet into the link wire format.
///
/// ```text
/// ┌──────────────┬───────────┬──────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Stream   │ Payload         │
/// │ 0x58 0x4C    │ (4B LE)   │ (2B LE)  │ (Length bytes)  │
/// │ "XL"         │           │          │                 │
/// └──────────────┴───────────┴──────────┴─────────────────┘
/// ```
pub fn encode_frame(stream: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(payload.len() as u32);
    dst.put_u16_le(stream);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one packet from the front of `src`.
///
/// Returns `Ok(None)` until `src` holds a complete packet; on success the
/// packet bytes are consumed.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(header) = src.get(..HEADER_SIZE) else {
        return Ok(None);
    };

    if header[..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let payload_len = u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize;
    let stream = u16::from_le_bytes([header[6], header[7]]);

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { stream, payload }))
}

/// Link codec configuration.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 64 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
